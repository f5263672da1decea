//! Cache-Aside Service
//!
//! Sequences backing-store and cache calls for each logical operation.
//!
//! The ordering rule: the backing store is always mutated before the cache,
//! and the cache is always consulted before the store on reads. The store is
//! authoritative; the cache is best-effort.
//!
//! # Staleness window
//! There is no per-key locking. A read that misses, fetches from the store
//! and then fills the cache can land its fill after a concurrent delete has
//! already removed the row and erased the cache entry. The cache then serves
//! the deleted (previously stored, uncorrupted) value until the key is
//! evicted or overwritten. Likewise, two writers racing on one key may leave
//! the cache holding the older of the two values until the next write.

use tracing::debug;

use crate::backend::ConnectorPool;
use crate::cache::CacheStore;
use crate::error::{KvError, Result};

// == Operation ==
/// A logical request as handed over by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Read { key: Vec<u8> },
    Write { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

// == Outcome ==
/// Flat result of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Succeeded; carries the value for reads
    Found(Option<Vec<u8>>),
    /// Key absent from the backing store
    NotFound,
    /// Store failure or invalid request
    Error(String),
}

impl From<Result<Option<Vec<u8>>>> for Outcome {
    fn from(result: Result<Option<Vec<u8>>>) -> Self {
        match result {
            Ok(value) => Outcome::Found(value),
            Err(KvError::NotFound(_)) => Outcome::NotFound,
            Err(e) => Outcome::Error(e.to_string()),
        }
    }
}

// == KV Service ==
/// Cache-aside coordinator over a [`CacheStore`] and a [`ConnectorPool`].
pub struct KvService {
    cache: CacheStore,
    pool: ConnectorPool,
}

impl KvService {
    pub fn new(cache: CacheStore, pool: ConnectorPool) -> Self {
        Self { cache, pool }
    }

    // == Read ==
    /// Returns the value for `key`.
    ///
    /// A cache hit never touches the store. On a miss the store is queried
    /// and a found value is filled into the cache; absence is not cached.
    pub async fn read(&self, key: &[u8]) -> Result<Vec<u8>> {
        if let Some(value) = self.cache.get(key) {
            return Ok(value);
        }

        match self.pool.get(key).await? {
            Some(value) => {
                self.cache.put(key.to_vec(), value.clone());
                debug!(key = %String::from_utf8_lossy(key), "Filled cache from store");
                Ok(value)
            }
            None => Err(KvError::not_found(key)),
        }
    }

    // == Write ==
    /// Stores `value` under `key`.
    ///
    /// The store write happens first; the cache is only updated once it
    /// succeeds, so a failed write leaves the cache untouched.
    pub async fn write(&self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.pool.put(&key, &value).await?;
        self.cache.put(key, value);
        Ok(())
    }

    // == Delete ==
    /// Deletes `key`, reporting NotFound when the store had no such record.
    ///
    /// After the store answers, the key is erased from the cache whether or
    /// not the store removed anything, so a stale cached copy cannot be
    /// served afterwards. A failed store delete leaves the cache untouched:
    /// the row may still exist, and a failed mutation never changes the cache.
    pub async fn delete(&self, key: &[u8]) -> Result<()> {
        let existed = self.pool.delete(key).await?;
        self.cache.erase(key);

        if existed {
            Ok(())
        } else {
            Err(KvError::not_found(key))
        }
    }

    // == Execute ==
    /// Runs an [`Operation`] and folds the result into an [`Outcome`].
    ///
    /// Library-level entry point for embedders that want a flat result. The
    /// HTTP handlers call `read`, `write` and `delete` directly so that
    /// validation and store failures keep distinct status codes.
    pub async fn execute(&self, op: Operation) -> Outcome {
        let result = match op {
            Operation::Read { key } => self.read(&key).await.map(Some),
            Operation::Write { key, value } => self.write(key, value).await.map(|_| None),
            Operation::Delete { key } => self.delete(&key).await.map(|_| None),
        };
        Outcome::from(result)
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Closes the backing-store pool. The cache stays readable.
    pub fn close(&self) {
        self.pool.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Backend, Connection, MemoryStore};
    use crate::error::{StoreError, StoreResult};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    /// Memory connection with a switch that makes every call fail.
    struct FlakyConnection {
        inner: crate::backend::MemoryConnection,
        failing: Arc<AtomicBool>,
    }

    impl FlakyConnection {
        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                Err(StoreError::Connection("connection lost".to_string()))
            } else {
                Ok(())
            }
        }
    }

    impl Connection for FlakyConnection {
        fn get(&mut self, key: &[u8]) -> StoreResult<Option<Vec<u8>>> {
            self.check()?;
            self.inner.get(key)
        }

        fn put(&mut self, key: &[u8], value: &[u8]) -> StoreResult<()> {
            self.check()?;
            self.inner.put(key, value)
        }

        fn delete(&mut self, key: &[u8]) -> StoreResult<bool> {
            self.check()?;
            self.inner.delete(key)
        }
    }

    fn memory_service(capacity: usize) -> (KvService, MemoryStore) {
        let store = MemoryStore::new();
        let pool = ConnectorPool::connect(
            &Backend::Memory(store.clone()),
            2,
            Duration::from_secs(1),
        )
        .unwrap();
        (KvService::new(CacheStore::new(capacity), pool), store)
    }

    fn flaky_service() -> (KvService, MemoryStore, Arc<AtomicBool>) {
        let store = MemoryStore::new();
        let failing = Arc::new(AtomicBool::new(false));
        let conns = (0..2)
            .map(|_| {
                Box::new(FlakyConnection {
                    inner: store.connect(),
                    failing: failing.clone(),
                }) as Box<dyn Connection>
            })
            .collect();
        let pool = ConnectorPool::from_connections(conns, Duration::from_secs(1)).unwrap();
        (KvService::new(CacheStore::new(16), pool), store, failing)
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let (service, store) = memory_service(16);

        service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();

        assert_eq!(service.read(b"k").await.unwrap(), b"v".to_vec());
        assert_eq!(store.record(b"k"), Some(b"v".to_vec()));
        assert_eq!(service.cache().stats().hits, 1);
    }

    #[tokio::test]
    async fn test_write_delete_read_is_not_found() {
        let (service, _store) = memory_service(16);

        service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        service.delete(b"k").await.unwrap();

        assert!(matches!(service.read(b"k").await, Err(KvError::NotFound(_))));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_read_miss_fills_cache() {
        let (service, store) = memory_service(16);
        store.connect().put(b"cold", b"from-store").unwrap();

        assert_eq!(service.read(b"cold").await.unwrap(), b"from-store".to_vec());
        assert_eq!(service.cache().len(), 1);

        // Second read is served from the cache even if the row changes
        store.connect().put(b"cold", b"changed").unwrap();
        assert_eq!(service.read(b"cold").await.unwrap(), b"from-store".to_vec());
    }

    #[tokio::test]
    async fn test_absence_is_not_cached() {
        let (service, store) = memory_service(16);

        assert!(matches!(service.read(b"k").await, Err(KvError::NotFound(_))));
        assert!(service.cache().is_empty());

        store.connect().put(b"k", b"late").unwrap();
        assert_eq!(service.read(b"k").await.unwrap(), b"late".to_vec());
    }

    #[tokio::test]
    async fn test_delete_missing_key_erases_stale_cache_entry() {
        let (service, store) = memory_service(16);
        service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();
        // Row vanishes behind the service's back
        store.connect().delete(b"k").unwrap();

        assert!(matches!(service.delete(b"k").await, Err(KvError::NotFound(_))));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let (service, store, failing) = flaky_service();
        service.write(b"k".to_vec(), b"old".to_vec()).await.unwrap();

        failing.store(true, Ordering::SeqCst);
        let result = service.write(b"k".to_vec(), b"new".to_vec()).await;
        assert!(matches!(result, Err(KvError::Store(_))));

        failing.store(false, Ordering::SeqCst);
        assert_eq!(service.read(b"k").await.unwrap(), b"old".to_vec());
        assert_eq!(store.record(b"k"), Some(b"old".to_vec()));
    }

    #[tokio::test]
    async fn test_failed_write_of_new_key_is_not_readable() {
        let (service, _store, failing) = flaky_service();

        failing.store(true, Ordering::SeqCst);
        assert!(service.write(b"k".to_vec(), b"v".to_vec()).await.is_err());
        failing.store(false, Ordering::SeqCst);

        assert!(matches!(service.read(b"k").await, Err(KvError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_delete_leaves_cache_untouched() {
        let (service, _store, failing) = flaky_service();
        service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();

        failing.store(true, Ordering::SeqCst);
        assert!(matches!(service.delete(b"k").await, Err(KvError::Store(_))));

        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test]
    async fn test_store_error_on_read_miss_is_not_not_found() {
        let (service, _store, failing) = flaky_service();
        failing.store(true, Ordering::SeqCst);

        let result = service.read(b"k").await;

        assert!(matches!(result, Err(KvError::Store(_))));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_touch_store() {
        let (service, _store, failing) = flaky_service();
        service.write(b"k".to_vec(), b"v".to_vec()).await.unwrap();

        failing.store(true, Ordering::SeqCst);

        assert_eq!(service.read(b"k").await.unwrap(), b"v".to_vec());
    }

    #[tokio::test]
    async fn test_execute_outcomes() {
        let (service, _store, failing) = flaky_service();

        let write = Operation::Write {
            key: b"k".to_vec(),
            value: b"v".to_vec(),
        };
        assert_eq!(service.execute(write).await, Outcome::Found(None));

        let read = Operation::Read { key: b"k".to_vec() };
        assert_eq!(service.execute(read).await, Outcome::Found(Some(b"v".to_vec())));

        let delete = Operation::Delete { key: b"k".to_vec() };
        assert_eq!(service.execute(delete.clone()).await, Outcome::Found(None));
        assert_eq!(service.execute(delete).await, Outcome::NotFound);

        failing.store(true, Ordering::SeqCst);
        let read = Operation::Read { key: b"x".to_vec() };
        assert!(matches!(service.execute(read).await, Outcome::Error(_)));
    }

    #[tokio::test]
    async fn test_evicted_key_is_read_back_from_store() {
        let (service, _store) = memory_service(2);

        service.write(b"a".to_vec(), b"1".to_vec()).await.unwrap();
        service.write(b"b".to_vec(), b"2".to_vec()).await.unwrap();
        service.write(b"c".to_vec(), b"3".to_vec()).await.unwrap();

        assert_eq!(service.cache().len(), 2);
        assert_eq!(service.read(b"a").await.unwrap(), b"1".to_vec());
        assert_eq!(service.cache().stats().evictions, 2);
    }

    #[tokio::test]
    async fn test_closed_service_reports_store_error() {
        let (service, _store) = memory_service(2);

        service.close();

        let result = service.write(b"k".to_vec(), b"v".to_vec()).await;
        assert!(matches!(result, Err(KvError::Store(StoreError::Closed))));
        assert!(service.cache().is_empty());
    }
}
