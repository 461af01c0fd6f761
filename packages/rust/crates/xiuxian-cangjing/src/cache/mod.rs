//! Result caches wrapping the expensive read paths.

mod heavy_cache;
mod search_cache;

use std::time::Duration;

use serde::Serialize;

pub use heavy_cache::{DEFAULT_HEAVY_CACHE_SIZE, HeavyCache, HeavyKey, canonical_json};
pub use search_cache::{DEFAULT_SEARCH_CACHE_SIZE, DEFAULT_SEARCH_CACHE_TTL_SECS, SearchCache};

use crate::config::EngineConfig;
use crate::schedule::SharedClock;
use crate::search::SearchResponse;

/// Both caches, cleared together on every revision bump.
#[derive(Debug)]
pub struct CacheLayer {
    /// Search responses.
    pub search: SearchCache<SearchResponse>,
    /// Graph and tree results.
    pub heavy: HeavyCache,
}

/// Cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Search cache entries.
    pub search_entries: usize,
    /// Search cache capacity.
    pub search_capacity: usize,
    /// Heavy cache entries.
    pub heavy_entries: usize,
}

impl CacheLayer {
    /// Build from configuration.
    #[must_use]
    pub fn new(config: &EngineConfig, clock: SharedClock) -> Self {
        Self {
            search: SearchCache::new(
                config.search_cache_size,
                Duration::from_secs(config.search_cache_ttl_secs),
                clock,
            ),
            heavy: HeavyCache::new(config.heavy_cache_size),
        }
    }

    /// Invalidate everything.
    pub fn clear(&mut self) {
        self.search.clear();
        self.heavy.clear();
    }

    /// Occupancy snapshot.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            search_entries: self.search.len(),
            search_capacity: self.search.capacity(),
            heavy_entries: self.heavy.len(),
        }
    }
}
