//! Install status resolution and the skip-version override.

use anyhow::{Context, Result};
use log::debug;

use super::{Installer, InstallStatus, Package, PackageAction};
use super::version::{Comparison, Scheme, VersionComparator};
use crate::store::{KeyPath, KeyValueStore};

/// Default base path of installed-product records.
pub const UNINSTALL_PATH: &str = r"Software\Microsoft\Windows\CurrentVersion\Uninstall";

/// Default base path of this application's per-product settings.
pub const SETTINGS_PATH: &str = r"Software\Bahkat";

/// Value holding the installed version under an uninstall record.
pub const DISPLAY_VERSION: &str = "DisplayVersion";

/// Value holding the version the user chose to skip.
pub const SKIP_VERSION: &str = "SkipVersion";

/// Where installed state and overrides live inside the store.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusKeys {
    pub uninstall_path: KeyPath,
    pub settings_path: KeyPath,
}

impl Default for StatusKeys {
    fn default() -> Self {
        Self {
            uninstall_path: KeyPath::parse(UNINSTALL_PATH),
            settings_path: KeyPath::parse(SETTINGS_PATH),
        }
    }
}

/// Classifies packages against installed state held in a [`KeyValueStore`].
pub struct PackageService<S: KeyValueStore> {
    store: S,
    keys: StatusKeys,
}

impl<S: KeyValueStore> PackageService<S> {
    pub fn new(store: S) -> Self {
        Self::with_keys(store, StatusKeys::default())
    }

    pub fn with_keys(store: S, keys: StatusKeys) -> Self {
        Self { store, keys }
    }

    /// Determine the install status of a package.
    ///
    /// The installed version is read from `DisplayVersion` under the
    /// product's uninstall record and compared as an assembly version first,
    /// then as a semantic version. The skip-version override is only
    /// consulted when the assembly comparison cannot parse either string.
    ///
    /// Store failures are returned as errors; a missing record is not one.
    #[tracing::instrument(skip(self, package), fields(id = %package.id))]
    pub fn install_status(&self, package: &Package) -> Result<InstallStatus> {
        let Some(installer) = &package.installer else {
            return Ok(InstallStatus::ErrorNoInstaller);
        };

        // An empty code would address the uninstall base key itself
        if installer.product_code.trim().is_empty() {
            debug!("{} has no product code, treating as not installed", package.id);
            return Ok(InstallStatus::NotInstalled);
        }

        let path = self.keys.uninstall_path.join(&installer.product_code);
        let Some(key) = self
            .store
            .open_key(&path)
            .with_context(|| format!("Failed to open {}", path))?
        else {
            return Ok(InstallStatus::NotInstalled);
        };

        let installed = key
            .get_string(DISPLAY_VERSION)
            .with_context(|| format!("Failed to read {} from {}", DISPLAY_VERSION, path))?
            .unwrap_or_default();
        if installed.is_empty() {
            return Ok(InstallStatus::ErrorParsingVersion);
        }

        debug!(
            "Comparing {} {} against installed {}",
            package.id, package.version, installed
        );

        if let Some(status) = classify(Scheme::Assembly, &package.version, &installed) {
            return Ok(status);
        }

        if self.skipped_version_of(installer)?.as_deref() == Some(package.version.as_str()) {
            return Ok(InstallStatus::VersionSkipped);
        }

        Ok(classify(Scheme::Semantic, &package.version, &installed)
            .unwrap_or(InstallStatus::ErrorParsingVersion))
    }

    pub fn requires_update(&self, package: &Package) -> Result<bool> {
        Ok(self.install_status(package)? == InstallStatus::RequiresUpdate)
    }

    /// Action a selection of this package defaults to.
    pub fn default_action(&self, package: &Package) -> Result<PackageAction> {
        self.install_status(package).map(PackageAction::from)
    }

    /// Packages that have a newer version than the one installed.
    pub fn updates_available<'a>(&self, packages: &'a [Package]) -> Result<Vec<&'a Package>> {
        let mut updates = Vec::new();
        for package in packages {
            if self.requires_update(package)? {
                updates.push(package);
            }
        }
        Ok(updates)
    }

    /// Record that the user does not want to be offered `package.version`.
    #[tracing::instrument(skip(self, package), fields(id = %package.id))]
    pub fn skip_version(&self, package: &Package) -> Result<()> {
        let Some(installer) = &package.installer else {
            anyhow::bail!(
                "Cannot skip {} {}: package has no installer",
                package.id,
                package.version
            );
        };
        if installer.product_code.trim().is_empty() {
            anyhow::bail!(
                "Cannot skip {} {}: installer has no product code",
                package.id,
                package.version
            );
        }

        let path = self.keys.settings_path.join(&installer.product_code);
        self.store
            .create_key(&path)
            .and_then(|key| key.set_string(SKIP_VERSION, &package.version))
            .with_context(|| format!("Failed to record skipped version under {}", path))
    }

    /// The version recorded by [`Self::skip_version`], if any.
    pub fn skipped_version(&self, package: &Package) -> Result<Option<String>> {
        match &package.installer {
            Some(installer) => self.skipped_version_of(installer),
            None => Ok(None),
        }
    }

    fn skipped_version_of(&self, installer: &Installer) -> Result<Option<String>> {
        if installer.product_code.trim().is_empty() {
            return Ok(None);
        }
        let path = self.keys.settings_path.join(&installer.product_code);
        match self.store.open_key(&path)? {
            Some(key) => key.get_string(SKIP_VERSION),
            None => Ok(None),
        }
    }
}

fn classify(scheme: Scheme, candidate: &str, installed: &str) -> Option<InstallStatus> {
    match VersionComparator::compare(scheme, candidate, installed) {
        Comparison::Greater => Some(InstallStatus::RequiresUpdate),
        Comparison::LessOrEqual => Some(InstallStatus::UpToDate),
        Comparison::Unparseable => None,
    }
}
