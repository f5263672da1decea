//! In-process backing store.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::Connection;
use crate::error::StoreResult;

/// Shared key-value map standing in for a durable store.
///
/// Cloning shares the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a connection handle onto the shared records.
    pub fn connect(&self) -> MemoryConnection {
        MemoryConnection {
            records: Arc::clone(&self.records),
        }
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Reads a record directly, bypassing any pool.
    pub fn record(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.records.lock().get(key).cloned()
    }
}

/// Connection handle onto a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryConnection {
    records: Arc<Mutex<HashMap<Vec<u8>, Vec<u8>>>>,
}

impl Connection for MemoryConnection {
    fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.records.lock().get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
        self.records.lock().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> StoreResult<bool> {
        Ok(self.records.lock().remove(key).is_some())
    }
}
