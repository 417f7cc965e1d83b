//! Package descriptors and install status resolution
//!
//! This module describes installable packages and decides, from installed
//! state held in a key/value store, whether each one needs installing,
//! updating, or nothing at all.

mod model;
mod service;
mod status;
pub mod version;

pub use model::{Installer, Package};
pub use service::{
    DISPLAY_VERSION, PackageService, SETTINGS_PATH, SKIP_VERSION, StatusKeys, UNINSTALL_PATH,
};
pub use status::{InstallStatus, PackageAction};
pub use version::{AssemblyVersion, Comparison, Scheme, VersionComparator};
