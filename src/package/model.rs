use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::runtime::Runtime;

/// An installable package as described by a repository index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installer: Option<Installer>,
}

/// Where to fetch a package's installer and how to find it once installed.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Installer {
    pub url: String,
    pub product_code: String,
    #[serde(default)]
    pub silent_args: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub installed_size: u64,
}

impl Package {
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            installer: None,
        }
    }

    pub fn with_installer(mut self, installer: Installer) -> Self {
        self.installer = Some(installer);
        self
    }

    /// Load a list of package descriptors from a JSON file.
    #[tracing::instrument(skip(runtime))]
    pub fn load_all<R: Runtime>(runtime: &R, path: &Path) -> Result<Vec<Package>> {
        let content = runtime.read_to_string(path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse package list at {:?}", path))
    }
}

impl Installer {
    pub fn new(url: impl Into<String>, product_code: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_code: product_code.into(),
            ..Default::default()
        }
    }
}
