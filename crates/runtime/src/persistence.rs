//! Persistence Adapter (C8): a scoped KV store backing `saveVar`/`loadVar`, keyed by the fully
//! qualified canonical variable name (§4.8). Two implementations share one trait: `MemoryStore`
//! for tests and ephemeral sessions, `SledStore` for an embedded on-disk store, grounded in the
//! wider pack's `persistence` crate (`examples/r3e-network-neo-rs/crates/persistence`).

use std::collections::HashMap;
use std::fmt;
use twx_core::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    Encode(String),
    Backend(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Encode(msg) => write!(f, "persistence encode error: {msg}"),
            PersistenceError::Backend(msg) => write!(f, "persistence backend error: {msg}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// A scoped KV store keyed by qualified variable name (`Path::qualified_key`). `Send + Sync` so
/// a store could, in principle, be shared across VM instances even though only one VM drives it
/// at a time (§5).
pub trait PersistenceStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError>;
    fn put(&mut self, key: &str, value: Value) -> Result<(), PersistenceError>;
    fn flush(&mut self) -> Result<(), PersistenceError>;
}

/// A `HashMap`-backed store for tests and ephemeral (no-persistence) sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistenceStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// An embedded on-disk store via `sled`. Values are encoded with `bincode` (the teacher's
/// `serialize.rs` idiom for a deterministic, versioned on-disk `Value` encoding).
#[cfg(feature = "persistence-sled")]
pub struct SledStore {
    tree: sled::Db,
}

#[cfg(feature = "persistence-sled")]
impl SledStore {
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self, PersistenceError> {
        let tree = sled::open(path).map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(SledStore { tree })
    }
}

#[cfg(feature = "persistence-sled")]
impl PersistenceStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        match self.tree.get(key).map_err(|e| PersistenceError::Backend(e.to_string()))? {
            Some(bytes) => {
                let value: Value = bincode::deserialize(&bytes)
                    .map_err(|e| PersistenceError::Encode(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn put(&mut self, key: &str, value: Value) -> Result<(), PersistenceError> {
        let bytes = bincode::serialize(&value).map_err(|e| PersistenceError::Encode(e.to_string()))?;
        self.tree
            .insert(key, bytes)
            .map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        self.tree.flush().map_err(|e| PersistenceError::Backend(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("counter").unwrap(), None);
        store.put("counter", Value::Number(5.0)).unwrap();
        assert_eq!(store.get("counter").unwrap(), Some(Value::Number(5.0)));
    }

    #[cfg(feature = "persistence-sled")]
    #[test]
    fn sled_store_round_trips_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = SledStore::open(dir.path()).unwrap();
            store.put("counter", Value::Number(5.0)).unwrap();
            store.flush().unwrap();
        }
        let store = SledStore::open(dir.path()).unwrap();
        assert_eq!(store.get("counter").unwrap(), Some(Value::Number(5.0)));
    }
}
