//! Cache Entry Module
//!
//! Defines a single slot of the LRU list.

// == Cache Entry ==
/// A single entry in the doubly linked recency list.
///
/// Links are indices into the entry vector owned by [`LruList`](super::LruList),
/// so no entry is ever referenced from outside the cache.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    /// Opaque key bytes
    pub key: Vec<u8>,
    /// Stored value bytes
    pub value: Vec<u8>,
    /// Neighbour closer to the head (more recently used)
    pub prev: Option<usize>,
    /// Neighbour closer to the tail (less recently used)
    pub next: Option<usize>,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a detached entry.
    pub fn new(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            key,
            value,
            prev: None,
            next: None,
        }
    }
}
