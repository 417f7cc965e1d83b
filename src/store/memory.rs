use anyhow::{Result, anyhow};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use super::{KeyPath, KeyValueStore, StoreKey};

type Keys = HashMap<String, BTreeMap<String, String>>;

/// In-memory key/value store. Clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    keys: Arc<RwLock<Keys>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn open_key(&self, path: &KeyPath) -> Result<Option<Box<dyn StoreKey>>> {
        let normalized = path.normalized();
        let keys = self
            .keys
            .read()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;

        if !keys.contains_key(&normalized) {
            return Ok(None);
        }

        Ok(Some(Box::new(MemoryKey {
            keys: Arc::clone(&self.keys),
            path: normalized,
        })))
    }

    fn create_key(&self, path: &KeyPath) -> Result<Box<dyn StoreKey>> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;

        // Parents come into existence with the child, as registry keys do
        let mut prefix = KeyPath::default();
        for segment in path.segments() {
            prefix = prefix.join(segment);
            keys.entry(prefix.normalized()).or_default();
        }

        Ok(Box::new(MemoryKey {
            keys: Arc::clone(&self.keys),
            path: path.normalized(),
        }))
    }
}

struct MemoryKey {
    keys: Arc<RwLock<Keys>>,
    path: String,
}

impl StoreKey for MemoryKey {
    fn get_string(&self, name: &str) -> Result<Option<String>> {
        let keys = self
            .keys
            .read()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;

        Ok(keys
            .get(&self.path)
            .and_then(|values| values.get(&name.to_lowercase()))
            .cloned())
    }

    fn set_string(&self, name: &str, value: &str) -> Result<()> {
        let mut keys = self
            .keys
            .write()
            .map_err(|_| anyhow!("Memory store lock poisoned"))?;

        keys.entry(self.path.clone())
            .or_default()
            .insert(name.to_lowercase(), value.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_key() {
        let store = MemoryStore::new();
        assert!(store.open_key(&KeyPath::parse(r"a\b")).unwrap().is_none());
    }

    #[test]
    fn test_create_then_open() {
        let store = MemoryStore::new();
        let path = KeyPath::parse(r"Software\Test");

        store.create_key(&path).unwrap().set_string("Name", "value").unwrap();

        let key = store.open_key(&path).unwrap().unwrap();
        assert_eq!(key.get_string("Name").unwrap(), Some("value".to_string()));
        assert_eq!(key.get_string("Missing").unwrap(), None);
    }

    #[test]
    fn test_create_makes_parents() {
        let store = MemoryStore::new();
        store.create_key(&KeyPath::parse(r"a\b\c")).unwrap();

        assert!(store.open_key(&KeyPath::parse("a")).unwrap().is_some());
        assert!(store.open_key(&KeyPath::parse(r"a\b")).unwrap().is_some());
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let store = MemoryStore::new();
        store
            .create_key(&KeyPath::parse(r"SOFTWARE\Vendor"))
            .unwrap()
            .set_string("DisplayVersion", "1.0")
            .unwrap();

        let key = store
            .open_key(&KeyPath::parse(r"software\vendor"))
            .unwrap()
            .unwrap();
        assert_eq!(key.get_string("displayversion").unwrap(), Some("1.0".to_string()));
    }

    #[test]
    fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let other = store.clone();
        other.create_key(&KeyPath::parse("shared")).unwrap();
        assert!(store.open_key(&KeyPath::parse("shared")).unwrap().is_some());
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemoryStore::new();
        let key = store.create_key(&KeyPath::parse("k")).unwrap();
        key.set_string("v", "1").unwrap();
        key.set_string("v", "2").unwrap();
        assert_eq!(key.get_string("v").unwrap(), Some("2".to_string()));
    }
}
