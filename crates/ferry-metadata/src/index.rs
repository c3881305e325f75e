//! In-memory fuzzy index and its shared, swappable handle.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::keys::{derive_keys, strip_decorations};

/// Mapping from derived lookup keys to canonical title identifiers.
///
/// Built fresh on every aggregation run. The first identifier inserted for a
/// key wins, which keeps higher-priority sources authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuzzyIndex {
    entries: HashMap<String, String>,
}

impl FuzzyIndex {
    /// Empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `key → id` unless the key is already present.
    pub fn insert_if_absent(&mut self, key: String, id: &str) -> bool {
        if self.entries.contains_key(&key) {
            return false;
        }
        self.entries.insert(key, id.to_string());
        true
    }

    /// Insert every derived key of `name`; returns how many were new.
    pub fn insert_record(&mut self, name: &str, id: &str) -> usize {
        derive_keys(name)
            .into_iter()
            .filter(|key| self.insert_if_absent(key.clone(), id))
            .count()
    }

    /// Exact key probe.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Resolve a raw display name to a canonical identifier.
    ///
    /// Annotations, emoji and flag glyphs are stripped first; derived keys
    /// are then probed in order and the first hit wins.
    #[must_use]
    pub fn lookup(&self, raw_name: &str) -> Option<&str> {
        let cleaned = strip_decorations(raw_name);
        derive_keys(&cleaned)
            .iter()
            .find_map(|key| self.get(key))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cloneable handle to the current index; rebuilds swap the whole index at once.
#[derive(Debug, Clone, Default)]
pub struct SharedIndex {
    current: Arc<RwLock<Arc<FuzzyIndex>>>,
}

impl SharedIndex {
    /// Wrap an initial index.
    #[must_use]
    pub fn new(index: FuzzyIndex) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(index))),
        }
    }

    /// Snapshot of the index in effect right now.
    #[must_use]
    pub fn current(&self) -> Arc<FuzzyIndex> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the index; readers holding an older snapshot keep it.
    pub fn replace(&self, index: FuzzyIndex) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(index);
    }
}
