//! Cache Module
//!
//! Provides the in-memory, capacity-bounded LRU cache. It has no knowledge
//! of the backing store.

mod entry;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use lru::LruList;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
