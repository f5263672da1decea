//! Cache Store Module
//!
//! Thread-safe LRU cache shared by every request handler.

use parking_lot::Mutex;
use tracing::trace;

use crate::cache::{CacheStats, LruList, StatsSnapshot};

// == Cache Store ==
/// Capacity-bounded LRU cache safe for concurrent callers.
///
/// Every operation takes one exclusive lock over the whole list: lookups
/// refresh recency, so reads mutate too. Statistics are atomics outside
/// the lock. No operation can fail; absence is reported as `None`/`false`.
#[derive(Debug)]
pub struct CacheStore {
    /// Recency-ordered entries
    inner: Mutex<LruList>,
    /// Performance statistics
    stats: CacheStats,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `capacity` entries.
    ///
    /// A capacity of 0 is coerced to 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruList::new(capacity)),
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Returns a copy of the value for `key`, marking it most recently used.
    ///
    /// Records a hit or a miss regardless of outcome.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let value = self.inner.lock().get(key).map(<[u8]>::to_vec);
        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        value
    }

    // == Put ==
    /// Inserts or overwrites `key` as the most recently used entry.
    ///
    /// If a new key pushes the cache past capacity, the least recently used
    /// entry is evicted.
    pub fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        let evicted = self.inner.lock().put(key, value);
        if let Some(entry) = evicted {
            self.stats.record_eviction();
            trace!(key = %String::from_utf8_lossy(&entry.key), "Evicted LRU entry");
        }
    }

    // == Erase ==
    /// Removes `key`, returning whether an entry was present.
    pub fn erase(&self, key: &[u8]) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> StatsSnapshot {
        let (entries, capacity) = {
            let inner = self.inner.lock();
            (inner.len(), inner.capacity())
        };
        StatsSnapshot {
            hits: self.stats.hits(),
            misses: self.stats.misses(),
            evictions: self.stats.evictions(),
            entries,
            capacity,
        }
    }

    // == Reset Stats ==
    /// Zeroes hit, miss, and eviction counters. Entries are untouched.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        self.inner.lock().assert_consistent();
    }
}
