use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

use crate::{package::Package, runtime::Runtime};

use super::config::Config;

/// Stop offering the listed version of package `id` as an update.
#[tracing::instrument(skip(runtime, store_root))]
pub fn skip<R: Runtime + 'static>(
    runtime: R,
    packages_path: &Path,
    id: &str,
    store_root: Option<PathBuf>,
) -> Result<()> {
    let config = Config::new(runtime, store_root, None, None)?;
    let packages = Package::load_all(config.runtime.as_ref(), packages_path)?;
    let package = find_package(&packages, id)?;

    config.package_service().skip_version(package)?;
    info!("Recorded skip of {} {}", package.id, package.version);
    println!("   skipping {} {}", package.id, package.version);
    Ok(())
}

pub(crate) fn find_package<'a>(packages: &'a [Package], id: &str) -> Result<&'a Package> {
    packages.iter().find(|p| p.id == id).ok_or_else(|| {
        anyhow::anyhow!(
            "Package '{}' not found. Available packages: {}",
            id,
            packages
                .iter()
                .take(5)
                .map(|p| p.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}
