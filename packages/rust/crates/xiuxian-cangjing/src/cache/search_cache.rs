//! TTL cache for search responses with least-hit eviction.
//!
//! Reads bump the hit counter and refresh the timestamp; writes at capacity
//! evict the entry with the fewest hits (oldest first among ties).

use std::collections::HashMap;
use std::time::Duration;

use crate::schedule::SharedClock;

/// Default capacity.
pub const DEFAULT_SEARCH_CACHE_SIZE: usize = 100;
/// Default time-to-live.
pub const DEFAULT_SEARCH_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    touched_at: std::time::Instant,
    hits: u64,
}

/// Bounded TTL cache.
#[derive(Debug)]
pub struct SearchCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
    max_entries: usize,
    ttl: Duration,
    clock: SharedClock,
}

impl<V: Clone> SearchCache<V> {
    /// Create a cache; capacity is at least one.
    #[must_use]
    pub fn new(max_entries: usize, ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            max_entries: max_entries.max(1),
            ttl,
            clock,
        }
    }

    /// Fresh value for `key`, counting the hit.
    pub fn get(&mut self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let expired = {
            let entry = self.entries.get(key)?;
            now.duration_since(entry.touched_at) > self.ttl
        };
        if expired {
            self.entries.remove(key);
            return None;
        }
        let entry = self.entries.get_mut(key)?;
        entry.hits += 1;
        entry.touched_at = now;
        Some(entry.value.clone())
    }

    /// Store a value, evicting expired entries and then the least-hit entry.
    pub fn insert(&mut self, key: String, value: V) {
        let now = self.clock.now();
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.touched_at = now;
            return;
        }
        let ttl = self.ttl;
        self.entries
            .retain(|_, entry| now.duration_since(entry.touched_at) <= ttl);
        while self.entries.len() >= self.max_entries {
            let Some(victim) = self
                .entries
                .iter()
                .min_by(|(_, a), (_, b)| a.hits.cmp(&b.hits).then(a.touched_at.cmp(&b.touched_at)))
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            self.entries.remove(&victim);
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                touched_at: now,
                hits: 0,
            },
        );
    }

    /// Hit count of a cached key.
    #[must_use]
    pub fn hits(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|entry| entry.hits)
    }

    /// Whether `key` is present (fresh or not).
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
