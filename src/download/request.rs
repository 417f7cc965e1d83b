use anyhow::{Context, Result};
use reqwest::Url;
use std::path::{Path, PathBuf};

use crate::http::ProgressSink;
use crate::package::Package;

/// One package to download and where to put it.
#[derive(Debug)]
pub struct DownloadRequest {
    pub package: Package,
    pub destination: PathBuf,
    pub progress: Option<ProgressSink>,
}

impl DownloadRequest {
    /// Request `package`'s installer into `scratch_dir`, named by
    /// [`file_name_for`]. An existing file at that path is overwritten.
    pub fn for_package(package: Package, scratch_dir: &Path) -> Result<Self> {
        let destination = scratch_dir.join(file_name_for(&package)?);
        Ok(Self {
            package,
            destination,
            progress: None,
        })
    }

    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }
}

/// File name for a package's installer: `{id}-{version}{ext}`, where `ext`
/// is the extension of the last path segment of the installer URL.
///
/// Fails if the package has no installer or its URL is not absolute.
pub fn file_name_for(package: &Package) -> Result<String> {
    let Some(installer) = &package.installer else {
        anyhow::bail!("Package {} has no installer", package.id);
    };

    let url = Url::parse(&installer.url)
        .with_context(|| format!("Invalid installer URL for {}: {}", package.id, installer.url))?;

    let extension = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    Ok(format!(
        "{}-{}{}",
        sanitize(&package.id),
        sanitize(&package.version),
        extension
    ))
}

/// Keep identifiers from escaping the scratch directory.
fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}
