//! Hierarchical key/value storage for installed-package state.
//!
//! Keys are addressed by backslash separated paths, like registry keys, and
//! hold named string values. Path segments and value names are matched
//! case-insensitively.
//!
//! # Structure
//!
//! - `file` - Persistent store backed by a directory tree
//! - `memory` - In-process store

mod file;
mod memory;

use anyhow::Result;
use std::fmt;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Path of a key inside a [`KeyValueStore`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath {
    segments: Vec<String>,
}

impl KeyPath {
    /// Parse a path such as `Software\Vendor\Product`. Empty segments are
    /// dropped and forward slashes are accepted as separators.
    pub fn parse(path: &str) -> Self {
        Self {
            segments: path
                .split(['\\', '/'])
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        }
    }

    /// Append one or more segments.
    pub fn join(&self, path: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(Self::parse(path).segments);
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Lowercased form used for lookups.
    pub(crate) fn normalized(&self) -> String {
        self.to_string().to_lowercase()
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("\\"))
    }
}

/// An open key.
#[cfg_attr(test, mockall::automock)]
pub trait StoreKey: Send + Sync {
    /// Read a string value. A missing value is `Ok(None)`.
    fn get_string(&self, name: &str) -> Result<Option<String>>;

    /// Write a string value, replacing any previous one.
    fn set_string(&self, name: &str, value: &str) -> Result<()>;
}

/// Path addressed storage, the stand-in for the system registry.
///
/// Implementations must tolerate concurrent reads. A single `set_string` is
/// atomic; nothing else is coordinated.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Open an existing key. A missing key is `Ok(None)`, not an error.
    fn open_key(&self, path: &KeyPath) -> Result<Option<Box<dyn StoreKey>>>;

    /// Open a key, creating it and any missing parents.
    fn create_key(&self, path: &KeyPath) -> Result<Box<dyn StoreKey>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = KeyPath::parse(r"Software\Microsoft\\Windows\");
        assert_eq!(path.segments(), ["Software", "Microsoft", "Windows"]);
        assert_eq!(path.to_string(), r"Software\Microsoft\Windows");
    }

    #[test]
    fn test_parse_forward_slashes() {
        assert_eq!(KeyPath::parse("a/b\\c").segments(), ["a", "b", "c"]);
    }

    #[test]
    fn test_join() {
        let base = KeyPath::parse(r"Software\Bahkat");
        let key = base.join("{ABC-123}");
        assert_eq!(key.to_string(), r"Software\Bahkat\{ABC-123}");
        // base is untouched
        assert_eq!(base.segments().len(), 2);
    }

    #[test]
    fn test_normalized_is_case_insensitive() {
        assert_eq!(
            KeyPath::parse(r"SOFTWARE\Foo").normalized(),
            KeyPath::parse(r"software\foo").normalized()
        );
    }

    #[test]
    fn test_root() {
        assert!(KeyPath::parse("").is_root());
        assert!(!KeyPath::parse("a").is_root());
    }
}
