//! Cache Metrics Collection
//!
//! Tier hit/miss statistics for monitoring cache health.

use std::sync::atomic::{AtomicU64, Ordering};

/// Cache metrics collector
#[derive(Debug, Default)]
pub struct CacheMetrics {
    // Memory tier
    memory_hits: AtomicU64,
    memory_misses: AtomicU64,

    // Persistent tier
    persistent_hits: AtomicU64,
    persistent_misses: AtomicU64,

    // Writes and invalidations
    writes: AtomicU64,
    persistent_write_failures: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_memory_miss(&self) {
        self.memory_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistent_hit(&self) {
        self.persistent_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistent_miss(&self) {
        self.persistent_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persistent_write_failure(&self) {
        self.persistent_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self, removed: u64) {
        self.invalidations.fetch_add(removed, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let memory_hits = self.memory_hits.load(Ordering::Relaxed);
        let memory_misses = self.memory_misses.load(Ordering::Relaxed);
        let persistent_hits = self.persistent_hits.load(Ordering::Relaxed);
        let persistent_misses = self.persistent_misses.load(Ordering::Relaxed);

        let lookups = memory_hits + memory_misses;
        let total_hits = memory_hits + persistent_hits;

        MetricsSnapshot {
            memory_hits,
            memory_misses,
            persistent_hits,
            persistent_misses,
            writes: self.writes.load(Ordering::Relaxed),
            persistent_write_failures: self.persistent_write_failures.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            overall_hit_ratio: if lookups == 0 {
                0.0
            } else {
                total_hits as f64 / lookups as f64
            },
        }
    }
}

/// Point-in-time cache metrics
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    /// Memory-tier hits
    pub memory_hits: u64,
    /// Memory-tier misses
    pub memory_misses: u64,
    /// Persistent-tier hits
    pub persistent_hits: u64,
    /// Persistent-tier misses (both tiers missed)
    pub persistent_misses: u64,
    /// Write-through operations
    pub writes: u64,
    /// Swallowed persistent-tier write failures
    pub persistent_write_failures: u64,
    /// Entries removed by invalidation
    pub invalidations: u64,
    /// Hits at any tier over all lookups (0.0 - 1.0)
    pub overall_hit_ratio: f64,
}

// =============================================================================
// Tests
// =============================================================================
