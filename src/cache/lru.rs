//! LRU List Module
//!
//! Implements the recency-ordered, capacity-bounded map behind the cache.

use std::collections::HashMap;
use std::mem;

use crate::cache::CacheEntry;

// == LRU List ==
/// Capacity-bounded map with least-recently-used eviction.
///
/// Entries live in a slab (`entries`) and are chained into a doubly linked
/// list by index:
/// - Head = Most recently used
/// - Tail = Least recently used
///
/// `index` maps each key to its slab slot, which gives O(1) expected time for
/// every operation. Not thread-safe on its own; see [`CacheStore`](super::CacheStore).
#[derive(Debug)]
pub struct LruList {
    /// Slab of entries, including released slots
    entries: Vec<CacheEntry>,
    /// Released slab slots available for reuse
    free: Vec<usize>,
    /// Key -> slab slot
    index: HashMap<Vec<u8>, usize>,
    head: Option<usize>,
    tail: Option<usize>,
    /// Maximum number of live entries, always >= 1
    capacity: usize,
}

impl LruList {
    // == Constructor ==
    /// Creates an empty list. A capacity of 0 is coerced to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
            capacity,
        }
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &[u8]) -> Option<&[u8]> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        Some(&self.entries[idx].value)
    }

    // == Peek ==
    /// Returns the value for `key` without touching its recency.
    pub fn peek(&self, key: &[u8]) -> Option<&[u8]> {
        self.index
            .get(key)
            .map(|&idx| self.entries[idx].value.as_slice())
    }

    // == Put ==
    /// Inserts or overwrites `key`, making it most recently used.
    ///
    /// Inserting a new key into a full list evicts exactly one entry, the
    /// least recently used one, and returns it.
    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) -> Option<CacheEntry> {
        if let Some(&idx) = self.index.get(key.as_slice()) {
            self.entries[idx].value = value;
            self.move_to_front(idx);
            return None;
        }

        // Make room first so the slab never holds more than `capacity` live entries
        let evicted = if self.index.len() >= self.capacity {
            self.pop_back()
        } else {
            None
        };

        let idx = self.allocate(CacheEntry::new(key.clone(), value));
        self.index.insert(key, idx);
        self.push_front(idx);

        debug_assert!(
            self.index.len() <= self.capacity,
            "cache size {} exceeds capacity {}",
            self.index.len(),
            self.capacity
        );
        evicted
    }

    // == Remove ==
    /// Removes `key` and returns its value, or None if absent.
    pub fn remove(&mut self, key: &[u8]) -> Option<Vec<u8>> {
        let idx = self.index.remove(key)?;
        self.detach(idx);
        Some(self.release(idx).value)
    }

    // == Pop Back ==
    /// Removes and returns the least recently used entry.
    pub fn pop_back(&mut self) -> Option<CacheEntry> {
        let idx = self.tail?;
        self.detach(idx);
        let entry = self.release(idx);
        self.index.remove(entry.key.as_slice());
        Some(entry)
    }

    // == Peek Oldest ==
    /// Returns the key that would be evicted next.
    pub fn peek_oldest(&self) -> Option<&[u8]> {
        self.tail.map(|idx| self.entries[idx].key.as_slice())
    }

    // == Keys ==
    /// Iterates keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &[u8]> + '_ {
        std::iter::successors(self.head, move |&idx| self.entries[idx].next)
            .map(move |idx| self.entries[idx].key.as_slice())
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.index.contains_key(key)
    }

    // == Link Management ==
    fn move_to_front(&mut self, idx: usize) {
        if self.head == Some(idx) {
            return;
        }
        self.detach(idx);
        self.push_front(idx);
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        {
            let entry = &mut self.entries[idx];
            entry.prev = None;
            entry.next = old_head;
        }
        match old_head {
            Some(head) => self.entries[head].prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.head = Some(idx);
    }

    fn detach(&mut self, idx: usize) {
        let (prev, next) = {
            let entry = &mut self.entries[idx];
            (entry.prev.take(), entry.next.take())
        };
        match prev {
            Some(p) => self.entries[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.entries[n].prev = prev,
            None => self.tail = prev,
        }
    }

    fn allocate(&mut self, entry: CacheEntry) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.entries[idx] = entry;
                idx
            }
            None => {
                self.entries.push(entry);
                self.entries.len() - 1
            }
        }
    }

    fn release(&mut self, idx: usize) -> CacheEntry {
        self.free.push(idx);
        mem::take(&mut self.entries[idx])
    }

    /// Panics if the list and the index have diverged.
    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert!(self.index.len() <= self.capacity, "size exceeds capacity");

        let mut walked = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(idx) = cursor {
            let entry = &self.entries[idx];
            assert_eq!(entry.prev, prev, "broken back link at slot {}", idx);
            assert_eq!(
                self.index.get(entry.key.as_slice()),
                Some(&idx),
                "index does not resolve to slot {}",
                idx
            );
            walked += 1;
            prev = Some(idx);
            cursor = entry.next;
        }
        assert_eq!(self.tail, prev, "tail does not match last linked slot");
        assert_eq!(walked, self.index.len(), "list and index sizes differ");
    }
}
