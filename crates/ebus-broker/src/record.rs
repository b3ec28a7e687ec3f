//! Shared key-value record store.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Prefix of the implicit group that receives changes to a key.
pub const RECORD_GROUP_PREFIX: &str = "@record/";

/// Group id subscribed to changes of `key`.
pub fn record_group(key: &str) -> String {
    format!("{RECORD_GROUP_PREFIX}{key}")
}

/// In-memory string map with its own lock, independent of the routing lock.
///
/// An unset key reads as the empty string.
#[derive(Debug, Default)]
pub struct RecordStore {
    values: Mutex<HashMap<String, String>>,
}

impl RecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`. Returns whether the visible value changed.
    pub fn set(&self, key: &str, value: &str) -> bool {
        let mut values = self.values.lock();
        let current = values.get(key).map_or("", String::as_str);
        if current == value && values.contains_key(key) {
            return false;
        }
        let changed = current != value;
        let _ = values.insert(key.to_owned(), value.to_owned());
        changed
    }

    /// Current value of `key`, empty if unset.
    pub fn get(&self, key: &str) -> String {
        self.values.lock().get(key).cloned().unwrap_or_default()
    }

    /// Whether `key` has ever been set.
    pub fn contains(&self, key: &str) -> bool {
        self.values.lock().contains_key(key)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether no key has been set.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }
}
