//! Tiered Cache - Unified Two-Tier Lookup
//!
//! Orchestrates the memory and persistent tiers: memory-first reads
//! with persistent backfill, write-through puts, and family-wide
//! invalidation after mutations.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::warn;

use super::memory::{MemoryCache, MemoryCacheConfig};
use super::metrics::{CacheMetrics, MetricsSnapshot};
use super::persistent::PersistentCache;
use super::DEFAULT_PERSISTENT_TTL;
use crate::error::Result;
use crate::store::KeyValueStore;

/// Which tier served a lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheHitTier {
    /// Memory tier (hot)
    Memory,
    /// Persistent tier (warm)
    Persistent,
}

impl std::fmt::Display for CacheHitTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheHitTier::Memory => write!(f, "memory"),
            CacheHitTier::Persistent => write!(f, "persistent"),
        }
    }
}

/// Tiered cache configuration
#[derive(Debug, Clone)]
pub struct TieredCacheConfig {
    /// Memory-tier configuration
    pub memory: MemoryCacheConfig,
    /// Persistent-tier TTL
    pub persistent_ttl: Duration,
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            memory: MemoryCacheConfig::default(),
            persistent_ttl: DEFAULT_PERSISTENT_TTL,
        }
    }
}

/// Unified two-tier cache
pub struct TieredCache {
    memory: MemoryCache,
    persistent: PersistentCache,
    metrics: Arc<CacheMetrics>,
}

impl TieredCache {
    /// Open with default configuration over a durable store
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_config(TieredCacheConfig::default(), store).await
    }

    /// Open with custom configuration; sweeps the persistent tier
    pub async fn with_config(
        config: TieredCacheConfig,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self> {
        Ok(Self {
            memory: MemoryCache::with_config(config.memory),
            persistent: PersistentCache::open(store, config.persistent_ttl).await?,
            metrics: Arc::new(CacheMetrics::new()),
        })
    }

    /// Get a payload, memory tier first, backfilling it on a
    /// persistent-tier hit. Returns the serving tier for diagnostics.
    pub async fn get(&self, key: &str) -> Option<(Bytes, CacheHitTier)> {
        if let Some(payload) = self.memory.get(key) {
            self.metrics.record_memory_hit();
            return Some((payload, CacheHitTier::Memory));
        }
        self.metrics.record_memory_miss();

        if let Some((payload, _created_at)) = self.persistent.get(key).await {
            self.metrics.record_persistent_hit();
            // Backfill with a fresh memory-tier timestamp: the memory
            // TTL governs re-check cadence, the persistent TTL governs
            // overall staleness.
            self.memory.put(key, payload.clone());
            return Some((payload, CacheHitTier::Persistent));
        }
        self.metrics.record_persistent_miss();

        None
    }

    /// Write through to both tiers.
    ///
    /// A persistent-tier failure is logged and swallowed; the memory
    /// tier remains authoritative for the session.
    pub async fn put(&self, key: &str, payload: Bytes) {
        self.metrics.record_write();
        self.memory.put(key, payload.clone());

        if let Err(e) = self.persistent.put(key, &payload).await {
            self.metrics.record_persistent_write_failure();
            warn!(key, error = %e, "persistent cache write failed, memory tier remains authoritative");
        }
    }

    /// Remove every entry in both tiers whose key contains the given
    /// substring. Used after a mutation so subsequent reads are not
    /// stale; substring matching drops a whole query family at once.
    pub async fn invalidate(&self, pattern: &str) -> usize {
        let mut removed = self.memory.invalidate(pattern);
        match self.persistent.invalidate(pattern).await {
            Ok(n) => removed += n,
            Err(e) => {
                warn!(pattern, error = %e, "persistent cache invalidation failed");
            }
        }
        self.metrics.record_invalidation(removed as u64);
        removed
    }

    /// Empty both tiers unconditionally
    pub async fn clear_all(&self) {
        self.memory.clear();
        if let Err(e) = self.persistent.clear().await {
            warn!(error = %e, "persistent cache clear failed");
        }
    }

    /// Metrics snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Reference to the memory tier
    pub fn memory(&self) -> &MemoryCache {
        &self.memory
    }

    /// Reference to the persistent tier
    pub fn persistent(&self) -> &PersistentCache {
        &self.persistent
    }
}

// =============================================================================
// Tests
// =============================================================================
