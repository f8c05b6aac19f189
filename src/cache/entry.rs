//! Cache Entry Types
//!
//! Memory-tier entries pair an opaque payload with a creation timestamp
//! (TTL) and a logical recency tick (LRU). The recency tick is assigned
//! by the owning cache from a monotonic counter rather than wall time,
//! so eviction ordering stays exact even for entries touched within the
//! same second.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;

/// Current wall time as epoch seconds
pub(crate) fn now_epoch() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// A memory-tier cache entry
#[derive(Debug)]
pub struct CacheEntry {
    /// Serialized payload
    payload: Bytes,
    /// Creation timestamp (epoch seconds)
    created_at: u64,
    /// Logical recency tick for LRU ordering
    last_access: AtomicU64,
}

impl CacheEntry {
    /// Create a new entry stamped with the current time
    pub fn new(payload: Bytes, tick: u64) -> Self {
        Self::with_created_at(payload, now_epoch(), tick)
    }

    /// Create an entry with an explicit creation timestamp.
    ///
    /// Used by TTL tests to backdate entries and by the persistent tier
    /// when backfilling preserves the original creation time.
    pub fn with_created_at(payload: Bytes, created_at: u64, tick: u64) -> Self {
        Self {
            payload,
            created_at,
            last_access: AtomicU64::new(tick),
        }
    }

    /// Get the payload (zero-copy)
    #[inline]
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Payload size in bytes
    #[inline]
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Creation timestamp (epoch seconds)
    #[inline]
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Whether the entry is logically absent under the given TTL
    #[inline]
    pub fn is_expired(&self, ttl: Duration) -> bool {
        now_epoch().saturating_sub(self.created_at) > ttl.as_secs()
    }

    /// Record an access at the given recency tick
    #[inline]
    pub fn record_access(&self, tick: u64) {
        self.last_access.store(tick, Ordering::Relaxed);
    }

    /// Last-access recency tick
    #[inline]
    pub fn last_access(&self) -> u64 {
        self.last_access.load(Ordering::Relaxed)
    }
}

impl Clone for CacheEntry {
    fn clone(&self) -> Self {
        Self {
            payload: self.payload.clone(),
            created_at: self.created_at,
            last_access: AtomicU64::new(self.last_access.load(Ordering::Relaxed)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
