use std::fmt;

/// Install state of a package relative to what is present on the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallStatus {
    NotInstalled,
    UpToDate,
    RequiresUpdate,
    VersionSkipped,
    ErrorNoInstaller,
    ErrorParsingVersion,
}

impl InstallStatus {
    /// Short human readable description.
    pub fn description(&self) -> &'static str {
        match self {
            InstallStatus::NotInstalled => "Not installed",
            InstallStatus::UpToDate => "Installed",
            InstallStatus::RequiresUpdate => "Update available",
            InstallStatus::VersionSkipped => "Version skipped",
            InstallStatus::ErrorNoInstaller => "No installer",
            InstallStatus::ErrorParsingVersion => "Invalid version",
        }
    }

    /// Whether the status could not be determined.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            InstallStatus::ErrorNoInstaller | InstallStatus::ErrorParsingVersion
        )
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// What selecting a package in an install batch would do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageAction {
    Install,
    Uninstall,
}

impl From<InstallStatus> for PackageAction {
    fn from(status: InstallStatus) -> Self {
        match status {
            InstallStatus::UpToDate => PackageAction::Uninstall,
            _ => PackageAction::Install,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_error() {
        assert!(InstallStatus::ErrorNoInstaller.is_error());
        assert!(InstallStatus::ErrorParsingVersion.is_error());
        assert!(!InstallStatus::NotInstalled.is_error());
        assert!(!InstallStatus::VersionSkipped.is_error());
    }

    #[test]
    fn test_display_uses_description() {
        assert_eq!(InstallStatus::RequiresUpdate.to_string(), "Update available");
        assert_eq!(InstallStatus::UpToDate.to_string(), "Installed");
    }

    #[test]
    fn test_default_action() {
        assert_eq!(PackageAction::from(InstallStatus::UpToDate), PackageAction::Uninstall);
        assert_eq!(PackageAction::from(InstallStatus::NotInstalled), PackageAction::Install);
        assert_eq!(PackageAction::from(InstallStatus::RequiresUpdate), PackageAction::Install);
        assert_eq!(PackageAction::from(InstallStatus::VersionSkipped), PackageAction::Install);
    }
}
