use anyhow::{Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{KeyPath, KeyValueStore, StoreKey};
use crate::runtime::Runtime;

const VALUES_FILE: &str = "values.json";

/// Key/value store persisted as a directory tree.
///
/// Each key is a directory under the store root; its values live in a
/// `values.json` object inside that directory.
pub struct FileStore<R: Runtime> {
    runtime: Arc<R>,
    root: PathBuf,
}

impl<R: Runtime + 'static> FileStore<R> {
    pub fn new(runtime: Arc<R>, root: PathBuf) -> Self {
        Self { runtime, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a key.
    ///
    /// Returns: `<root>/<segment>/<segment>/...` with lowercased segments
    pub fn key_dir(&self, path: &KeyPath) -> Result<PathBuf> {
        let mut dir = self.root.clone();
        for segment in path.segments() {
            if segment == "." || segment == ".." {
                anyhow::bail!("Invalid key path segment {:?} in {}", segment, path);
            }
            dir.push(segment.to_lowercase());
        }
        Ok(dir)
    }

    fn key(&self, dir: PathBuf) -> Box<dyn StoreKey> {
        Box::new(FileKey {
            runtime: Arc::clone(&self.runtime),
            dir,
        })
    }
}

impl<R: Runtime + 'static> KeyValueStore for FileStore<R> {
    #[tracing::instrument(skip(self))]
    fn open_key(&self, path: &KeyPath) -> Result<Option<Box<dyn StoreKey>>> {
        let dir = self.key_dir(path)?;
        if !self.runtime.is_dir(&dir) {
            return Ok(None);
        }
        Ok(Some(self.key(dir)))
    }

    #[tracing::instrument(skip(self))]
    fn create_key(&self, path: &KeyPath) -> Result<Box<dyn StoreKey>> {
        let dir = self.key_dir(path)?;
        if !self.runtime.is_dir(&dir) {
            debug!("Creating key directory {:?}", dir);
            self.runtime
                .create_dir_all(&dir)
                .with_context(|| format!("Failed to create key {}", path))?;
        }
        Ok(self.key(dir))
    }
}

struct FileKey<R: Runtime> {
    runtime: Arc<R>,
    dir: PathBuf,
}

impl<R: Runtime> FileKey<R> {
    fn values_path(&self) -> PathBuf {
        self.dir.join(VALUES_FILE)
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        let path = self.values_path();
        if !self.runtime.exists(&path) {
            return Ok(BTreeMap::new());
        }
        let content = self.runtime.read_to_string(&path)?;
        serde_json::from_str(&content)
            .with_context(|| format!("Corrupt key values at {:?}", path))
    }
}

impl<R: Runtime> StoreKey for FileKey<R> {
    fn get_string(&self, name: &str) -> Result<Option<String>> {
        Ok(self.load()?.remove(&name.to_lowercase()))
    }

    fn set_string(&self, name: &str, value: &str) -> Result<()> {
        let mut values = self.load()?;
        values.insert(name.to_lowercase(), value.to_string());

        // Write beside the target and rename so readers never see a partial file
        let path = self.values_path();
        let temp_path = self.dir.join(format!("{}.tmp", VALUES_FILE));
        let content = serde_json::to_string_pretty(&values)?;
        self.runtime
            .write(&temp_path, content.as_bytes())
            .with_context(|| format!("Failed to write key values to {:?}", temp_path))?;
        self.runtime
            .rename(&temp_path, &path)
            .with_context(|| format!("Failed to replace key values at {:?}", path))
    }
}
