//! Memory Cache - In-Process Hot Tier
//!
//! Bounded key-to-payload map with TTL expiry and LRU band eviction.
//! Fastest tier; lost on process restart.
//!
//! # Design
//!
//! - Entry-count capacity (default 100) rather than byte accounting:
//!   every entry is one serialized timeline page of bounded size
//! - When full, the oldest 20% of entries by recency tick are dropped
//!   in one pass
//! - Expired entries are removed lazily on read

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;

use super::entry::CacheEntry;
use super::{DEFAULT_MEMORY_CAPACITY, DEFAULT_MEMORY_TTL, EVICTION_BAND_FRACTION};

/// Memory cache configuration
#[derive(Debug, Clone)]
pub struct MemoryCacheConfig {
    /// Maximum number of entries
    pub capacity: usize,
    /// Entry time-to-live
    pub ttl: Duration,
    /// Fraction of entries evicted per pass when full
    pub eviction_band: f64,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_MEMORY_CAPACITY,
            ttl: DEFAULT_MEMORY_TTL,
            eviction_band: EVICTION_BAND_FRACTION,
        }
    }
}

/// Memory cache - in-process hot tier
pub struct MemoryCache {
    /// Entry storage
    storage: DashMap<String, CacheEntry>,
    /// Configuration
    config: MemoryCacheConfig,
    /// Monotonic recency counter
    tick: AtomicU64,
    /// Hit count
    hits: AtomicU64,
    /// Miss count
    misses: AtomicU64,
    /// Eviction count
    evictions: AtomicU64,
}

impl MemoryCache {
    /// Create a new memory cache with default configuration
    pub fn new() -> Self {
        Self::with_config(MemoryCacheConfig::default())
    }

    /// Create a new memory cache with custom configuration
    pub fn with_config(config: MemoryCacheConfig) -> Self {
        Self {
            storage: DashMap::new(),
            config,
            tick: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn next_tick(&self) -> u64 {
        self.tick.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Get a payload, refreshing its LRU recency on hit.
    ///
    /// Expired entries count as a miss and are removed on the spot.
    pub fn get(&self, key: &str) -> Option<Bytes> {
        let expired = match self.storage.get(key) {
            Some(entry) => {
                if entry.is_expired(self.config.ttl) {
                    true
                } else {
                    entry.record_access(self.next_tick());
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.payload().clone());
                }
            }
            None => false,
        };

        if expired {
            self.storage.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Insert a payload, evicting the LRU band first if at capacity
    pub fn put(&self, key: impl Into<String>, payload: Bytes) {
        let key = key.into();
        if self.storage.len() >= self.config.capacity && !self.storage.contains_key(&key) {
            self.evict_band();
        }
        let entry = CacheEntry::new(payload, self.next_tick());
        self.storage.insert(key, entry);
    }

    /// Insert a pre-built entry (persistent-tier backfill, TTL tests)
    pub fn put_entry(&self, key: impl Into<String>, entry: CacheEntry) {
        let key = key.into();
        if self.storage.len() >= self.config.capacity && !self.storage.contains_key(&key) {
            self.evict_band();
        }
        entry.record_access(self.next_tick());
        self.storage.insert(key, entry);
    }

    /// Drop the least-recently-accessed band of entries in one pass
    fn evict_band(&self) {
        let band = ((self.config.capacity as f64) * self.config.eviction_band).ceil() as usize;
        let band = band.max(1);

        let mut candidates: Vec<(String, u64)> = self
            .storage
            .iter()
            .map(|e| (e.key().clone(), e.value().last_access()))
            .collect();
        candidates.sort_by_key(|(_, tick)| *tick);

        for (key, _) in candidates.into_iter().take(band) {
            if self.storage.remove(&key).is_some() {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Remove a single key; returns whether it existed
    pub fn remove(&self, key: &str) -> bool {
        self.storage.remove(key).is_some()
    }

    /// Remove every entry whose key contains the given substring.
    ///
    /// Substring matching is intentional: invalidating by query
    /// signature drops all cached pages of that query family at once.
    pub fn invalidate(&self, pattern: &str) -> usize {
        let matching: Vec<String> = self
            .storage
            .iter()
            .filter(|e| e.key().contains(pattern))
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for key in matching {
            if self.storage.remove(&key).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Check if a key is present (ignoring expiry)
    pub fn contains(&self, key: &str) -> bool {
        self.storage.contains_key(key)
    }

    /// Number of entries physically present
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Hit count
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Miss count
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Eviction count
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }

    /// Hit ratio (0.0 - 1.0)
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total == 0.0 {
            0.0
        } else {
            hits / total
        }
    }

    /// Clear all entries
    pub fn clear(&self) {
        self.storage.clear();
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
