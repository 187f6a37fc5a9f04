//! String-keyed registry for late-bound type lookup.
//!
//! Entity types reference each other by name rather than by value, so two
//! types that point at each other never form a static reference cycle. A
//! registry is an ordinary value: build one at startup and hand it to
//! whoever needs lookups.

use std::collections::HashMap;
use std::sync::Arc;

/// Something that can be stored in a [`Registry`].
pub trait Registered {
    /// The name this entry is registered under.
    fn registry_key(&self) -> &str;
}

/// Mapping from type name to an immutable, shared entry.
#[derive(Debug)]
pub struct Registry<T> {
    entries: HashMap<String, Arc<T>>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T: Registered> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `entry` under its key, replacing any previous entry.
    ///
    /// Returns the replaced entry, if there was one.
    pub fn register(&mut self, entry: T) -> Option<Arc<T>> {
        let key = entry.registry_key().to_string();
        let previous = self.entries.insert(key.clone(), Arc::new(entry));
        if previous.is_some() {
            tracing::debug!(key = %key, "Registry entry replaced");
        }
        previous
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type names, sorted.
    pub fn type_names(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }
}
