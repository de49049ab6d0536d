//! Key-value state persistence for node subsystems.
//!
//! This crate defines the [`StateStore`] trait which abstracts over
//! different storage backends for durable node state: settlement records,
//! in-flight transaction bookkeeping, and similar small structured values.
//!
//! Values are stored as opaque bytes; the provided [`StateStore::get`] and
//! [`StateStore::put`] helpers encode values as JSON so that every field
//! round-trips losslessly, including optional nested structures.
//!
//! Keys are flat strings namespaced by prefix (e.g. `cashout_<hex-address>`).
//! [`StateStore::iterate_prefix`] walks one namespace; iteration order is
//! unspecified and callers must not depend on it.

use std::collections::BTreeMap;

use auto_impl::auto_impl;
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Error type for state store operations.
#[derive(Debug, Error)]
pub enum StateStoreError {
    /// IO error during storage operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// Storage backend specific error.
    #[error("storage error: {0}")]
    Storage(String),
}

/// Trait for durable key-value state persistence.
///
/// Implementations can store state in various backends:
/// - File-based (JSON, bincode, etc.)
/// - Database (SQLite, RocksDB, etc.)
/// - In-memory (for testing)
#[auto_impl(&, Box, Arc)]
pub trait StateStore: Send + Sync {
    /// Get the raw bytes stored under `key`, or `None` if absent.
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StateStoreError>;

    /// Store raw bytes under `key`, overwriting any previous value.
    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StateStoreError>;

    /// Remove `key` from the store. Removing an absent key is not an error.
    fn delete(&self, key: &str) -> Result<(), StateStoreError>;

    /// Visit every entry whose key starts with `prefix`.
    ///
    /// The callback returns `Ok(true)` to stop iteration early. Iteration
    /// order is unspecified.
    fn iterate_prefix(
        &self,
        prefix: &str,
        visit: &mut dyn FnMut(&str, &[u8]) -> Result<bool, StateStoreError>,
    ) -> Result<(), StateStoreError>;

    /// Get and decode the value stored under `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StateStoreError> {
        match self.get_raw(key)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| StateStoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    /// Encode and store `value` under `key`, overwriting any previous value.
    fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StateStoreError> {
        let bytes = serde_json::to_vec(value)
            .map_err(|e| StateStoreError::Serialization(e.to_string()))?;
        self.put_raw(key, bytes)
    }
}

/// In-memory state store for testing.
///
/// Does not persist across restarts. Useful for unit tests and development.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStateStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StateStoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put_raw(&self, key: &str, value: Vec<u8>) -> Result<(), StateStoreError> {
        self.entries.write().insert(key.to_owned(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StateStoreError> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn iterate_prefix(
        &self,
        prefix: &str,
        visit: &mut dyn FnMut(&str, &[u8]) -> Result<bool, StateStoreError>,
    ) -> Result<(), StateStoreError> {
        let entries = self.entries.read();
        for (key, value) in entries.range(prefix.to_owned()..) {
            if !key.starts_with(prefix) {
                break;
            }
            if visit(key, value)? {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        count: u64,
        label: Option<String>,
    }

    #[test]
    fn test_raw_roundtrip() {
        let store = MemoryStateStore::new();
        store.put_raw("key", b"value".to_vec()).unwrap();
        assert_eq!(store.get_raw("key").unwrap(), Some(b"value".to_vec()));
        assert_eq!(store.get_raw("missing").unwrap(), None);
    }

    #[test]
    fn test_typed_roundtrip() {
        let store = MemoryStateStore::new();
        let record = Record {
            count: 42,
            label: Some("answer".to_owned()),
        };
        store.put("record", &record).unwrap();
        assert_eq!(store.get::<Record>("record").unwrap(), Some(record));

        let bare = Record {
            count: 0,
            label: None,
        };
        store.put("bare", &bare).unwrap();
        assert_eq!(store.get::<Record>("bare").unwrap(), Some(bare));
    }

    #[test]
    fn test_get_wrong_type_is_serialization_error() {
        let store = MemoryStateStore::new();
        store.put_raw("key", b"not json".to_vec()).unwrap();
        assert!(matches!(
            store.get::<Record>("key"),
            Err(StateStoreError::Serialization(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = MemoryStateStore::new();
        store.put_raw("key", b"value".to_vec()).unwrap();
        store.delete("key").unwrap();
        assert_eq!(store.get_raw("key").unwrap(), None);
        // deleting again is fine
        store.delete("key").unwrap();
    }

    #[test]
    fn test_iterate_prefix() {
        let store = MemoryStateStore::new();
        store.put_raw("cashout_aa", b"1".to_vec()).unwrap();
        store.put_raw("cashout_bb", b"2".to_vec()).unwrap();
        store.put_raw("cheque_aa", b"3".to_vec()).unwrap();

        let mut seen = Vec::new();
        store
            .iterate_prefix("cashout_", &mut |key, value| {
                seen.push((key.to_owned(), value.to_vec()));
                Ok(false)
            })
            .unwrap();

        seen.sort();
        assert_eq!(
            seen,
            vec![
                ("cashout_aa".to_owned(), b"1".to_vec()),
                ("cashout_bb".to_owned(), b"2".to_vec()),
            ]
        );
    }

    #[test]
    fn test_iterate_prefix_early_stop() {
        let store = MemoryStateStore::new();
        store.put_raw("k_1", b"1".to_vec()).unwrap();
        store.put_raw("k_2", b"2".to_vec()).unwrap();

        let mut count = 0;
        store
            .iterate_prefix("k_", &mut |_, _| {
                count += 1;
                Ok(true)
            })
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_iterate_prefix_propagates_error() {
        let store = MemoryStateStore::new();
        store.put_raw("k_1", b"1".to_vec()).unwrap();

        let result = store.iterate_prefix("k_", &mut |_, _| {
            Err(StateStoreError::Storage("boom".to_owned()))
        });
        assert!(matches!(result, Err(StateStoreError::Storage(_))));
    }
}
