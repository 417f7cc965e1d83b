use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::{
    package::{Package, PackageService},
    runtime::Runtime,
    store::KeyValueStore,
};

use super::config::Config;

/// Print the install status of every package in `packages_path`.
#[tracing::instrument(skip(runtime, store_root))]
pub fn status<R: Runtime + 'static>(
    runtime: R,
    packages_path: &Path,
    store_root: Option<PathBuf>,
) -> Result<()> {
    let config = Config::new(runtime, store_root, None, None)?;
    let packages = Package::load_all(config.runtime.as_ref(), packages_path)?;
    if packages.is_empty() {
        println!("No packages listed.");
        return Ok(());
    }

    let service = config.package_service();
    for line in status_lines(&service, &packages) {
        println!("{}", line);
    }
    Ok(())
}

pub(crate) fn status_lines<S: KeyValueStore>(
    service: &PackageService<S>,
    packages: &[Package],
) -> Vec<String> {
    packages
        .iter()
        .map(|package| match service.install_status(package) {
            Ok(status) => {
                let line = format!("{} {}: {}", package.id, package.version, status.description());
                match service.skipped_version(package) {
                    Ok(Some(skipped)) if skipped == package.version => {
                        format!("{} (skipping {})", line, skipped)
                    }
                    Ok(_) => line,
                    Err(e) => format!("{} (skip record unreadable: {:#})", line, e),
                }
            }
            Err(e) => {
                debug!("Status lookup for {} failed: {:#}", package.id, e);
                format!("{} {}: error: {:#}", package.id, package.version, e)
            }
        })
        .collect()
}
