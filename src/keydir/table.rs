//! Keydir implementation
//!
//! HashMap-based keydir with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::KeydirEntry;

/// In-memory index of live keys
///
/// ## Concurrency:
/// - Lookups take the read lock; `set`/`delete`/`repoint` take the write lock
/// - Callers order mutations against the segment log (see `Engine`)
#[derive(Debug, Default)]
pub struct Keydir {
    entries: RwLock<HashMap<Vec<u8>, KeydirEntry>>,
}

impl Keydir {
    /// Create a new empty Keydir
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_map(entries: HashMap<Vec<u8>, KeydirEntry>) -> Self {
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Look up the current location of `key`
    pub fn get(&self, key: &[u8]) -> Option<KeydirEntry> {
        self.entries.read().get(key).copied()
    }

    /// Unconditional overwrite
    ///
    /// Only call once the record `entry` points at has been appended.
    pub fn set(&self, key: Vec<u8>, entry: KeydirEntry) -> Option<KeydirEntry> {
        self.entries.write().insert(key, entry)
    }

    /// Remove the mapping
    ///
    /// Only call once a tombstone for `key` has been appended.
    pub fn delete(&self, key: &[u8]) -> Option<KeydirEntry> {
        self.entries.write().remove(key)
    }

    /// Move `key` to `new` if it still points at `expected`
    ///
    /// Returns false (and changes nothing) when a concurrent put or delete
    /// replaced the entry in the meantime.
    pub fn repoint(&self, key: &[u8], expected: &KeydirEntry, new: KeydirEntry) -> bool {
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(current) if current.same_location(expected) => {
                *current = new;
                true
            }
            _ => false,
        }
    }

    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// All live keys, sorted
    pub fn keys(&self) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy of every entry (for diagnostics and tests)
    pub fn snapshot(&self) -> Vec<(Vec<u8>, KeydirEntry)> {
        let mut entries: Vec<_> = self
            .entries
            .read()
            .iter()
            .map(|(k, e)| (k.clone(), *e))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }
}
