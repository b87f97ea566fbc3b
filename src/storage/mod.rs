//! Local persistence boundary.
//!
//! The engine specifies what it reads and writes, not how storage works: a
//! scope-keyed document store for serialized pattern summaries. Two thin
//! implementations are provided; anything heavier lives outside the crate.

mod json_file;

pub use json_file::JsonFileStore;

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Scope-keyed store for serialized pattern summaries. A scope identifies
/// one analysis selection (platform/project/date-range); saving a scope
/// replaces its previous contents.
pub trait PatternStore: Send + Sync {
    fn save_summaries(&self, scope: &str, summaries: &[Value]) -> Result<(), StoreError>;
    fn load_summaries(&self, scope: &str) -> Result<Vec<Value>, StoreError>;
    fn list_scopes(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process store, used when no store path is configured and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<BTreeMap<String, Vec<Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl PatternStore for MemoryStore {
    fn save_summaries(&self, scope: &str, summaries: &[Value]) -> Result<(), StoreError> {
        self.inner
            .write()
            .expect("store lock poisoned")
            .insert(scope.to_string(), summaries.to_vec());
        Ok(())
    }

    fn load_summaries(&self, scope: &str) -> Result<Vec<Value>, StoreError> {
        Ok(self
            .inner
            .read()
            .expect("store lock poisoned")
            .get(scope)
            .cloned()
            .unwrap_or_default())
    }

    fn list_scopes(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .inner
            .read()
            .expect("store lock poisoned")
            .keys()
            .cloned()
            .collect())
    }
}

/// Construct a store from configuration: a path gets the file-backed store,
/// no path gets the in-memory one.
pub fn open_store(store_path: Option<&str>) -> Result<Arc<dyn PatternStore>, StoreError> {
    match store_path {
        Some(path) => Ok(Arc::new(JsonFileStore::open(path)?)),
        None => Ok(Arc::new(MemoryStore::new())),
    }
}
