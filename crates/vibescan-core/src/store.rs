//! Key-value persistence seam.
//!
//! The core stores untyped JSON values under fixed keys. Typed accessors
//! degrade to defaults when a key is missing, unreadable, or malformed.

use crate::history::HistoryEntry;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

pub const KEY_HISTORY: &str = "vibescan_history";
pub const KEY_SCAN_COUNT: &str = "vibescan_count";
pub const KEY_DAILY_COUNT: &str = "vibescan_daily_count";
pub const KEY_LAST_DATE: &str = "vibescan_last_date";
pub const KEY_BADGES: &str = "vibescan_badges";
pub const KEY_PREMIUM: &str = "vibescan_premium";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Persistent key-value store.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Append `entry` to the list at `list_key`, keeping at most `max_len`
    /// of the newest entries. A missing or non-list value starts a new list.
    fn append(&mut self, list_key: &str, entry: Value, max_len: usize) -> Result<(), StoreError> {
        let mut list = match self.get(list_key)? {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        list.push(entry);
        if list.len() > max_len {
            let excess = list.len() - max_len;
            list.drain(..excess);
        }
        self.set(list_key, Value::Array(list))
    }
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Box<T> {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn append(&mut self, list_key: &str, entry: Value, max_len: usize) -> Result<(), StoreError> {
        (**self).append(list_key, entry, max_len)
    }
}

/// In-process store. Nothing survives a restart.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), StoreError> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Read and decode `key`, or `T::default()` on any failure.
pub fn get_or_default<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    match store.get(key) {
        Ok(Some(value)) => match serde_json::from_value(value.clone()) {
            Ok(v) => v,
            // Counters written as strings by older clients.
            Err(_) => value
                .as_str()
                .and_then(|s| serde_json::from_str(s).ok())
                .unwrap_or_default(),
        },
        Ok(None) => T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "store read failed; using default");
            T::default()
        }
    }
}

/// Cumulative number of finished scans.
pub fn scan_count<S: KeyValueStore + ?Sized>(store: &S) -> u64 {
    get_or_default(store, KEY_SCAN_COUNT)
}

/// Unlocked badge ids.
pub fn unlocked_badges<S: KeyValueStore + ?Sized>(store: &S) -> Vec<String> {
    get_or_default(store, KEY_BADGES)
}

/// Stored scan history, oldest first. Malformed entries are dropped.
pub fn history<S: KeyValueStore + ?Sized>(store: &S) -> Vec<HistoryEntry> {
    let raw: Vec<Value> = get_or_default(store, KEY_HISTORY);
    raw.into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_roundtrip() {
        let mut store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", json!(3)).unwrap();
        assert_eq!(store.get("k").unwrap(), Some(json!(3)));
    }

    #[test]
    fn test_append_caps_fifo() {
        let mut store = MemoryStore::new();
        for i in 0..101 {
            store.append("list", json!(i), 100).unwrap();
        }
        let list = store.get("list").unwrap().unwrap();
        let items = list.as_array().unwrap();
        assert_eq!(items.len(), 100);
        assert_eq!(items[0], json!(1));
        assert_eq!(items[99], json!(100));
    }

    #[test]
    fn test_append_replaces_non_list() {
        let mut store = MemoryStore::new();
        store.set("list", json!("garbage")).unwrap();
        store.append("list", json!(1), 10).unwrap();
        assert_eq!(store.get("list").unwrap(), Some(json!([1])));
    }

    #[test]
    fn test_defaults() {
        let store = MemoryStore::new();
        assert_eq!(scan_count(&store), 0);
        assert!(unlocked_badges(&store).is_empty());
        assert!(history(&store).is_empty());
    }

    #[test]
    fn test_string_counter_is_accepted() {
        let mut store = MemoryStore::new();
        store.set(KEY_SCAN_COUNT, json!("12")).unwrap();
        assert_eq!(scan_count(&store), 12);
    }

    #[test]
    fn test_malformed_values_degrade() {
        let mut store = MemoryStore::new();
        store.set(KEY_SCAN_COUNT, json!({"nope": true})).unwrap();
        store.set(KEY_BADGES, json!(7)).unwrap();
        store
            .set(KEY_HISTORY, json!([{"timestamp": 1, "aura": 5, "vibe": "Rizz", "mode": "duo"}, {"bad": 1}]))
            .unwrap();
        assert_eq!(scan_count(&store), 0);
        assert!(unlocked_badges(&store).is_empty());
        let h = history(&store);
        assert_eq!(h.len(), 1);
        assert_eq!(h[0].aura, 5);
    }
}
