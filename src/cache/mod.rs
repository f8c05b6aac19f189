//! Two-Tiered Timeline Cache
//!
//! Serves previously fetched timeline pages without re-querying the
//! remote source, bounding memory and honoring staleness.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TieredCache                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Memory tier (L1)            │  Persistent tier (L2)        │
//! │  ┌────────────────────────┐  │  ┌────────────────────────┐  │
//! │  │ Bounded map            │  │  │ Durable KV store       │  │
//! │  │ TTL: 5 minutes         │  │  │ TTL: 24 hours          │  │
//! │  │ LRU band eviction      │  │  │ Init sweep + self-heal │  │
//! │  └────────────────────────┘  │  └────────────────────────┘  │
//! │              │               │              │               │
//! │              └───────── backfill on L2 hit ─┘               │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payloads are opaque serialized blobs (`bytes::Bytes`); typed
//! conversion happens only at the pagination facade.

mod entry;
mod memory;
mod metrics;
mod persistent;
mod tiered;

pub use entry::CacheEntry;
pub(crate) use entry::now_epoch;
pub use memory::{MemoryCache, MemoryCacheConfig};
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use persistent::PersistentCache;
pub use tiered::{CacheHitTier, TieredCache, TieredCacheConfig};

use std::time::Duration;

/// Memory-tier TTL (5 minutes)
pub const DEFAULT_MEMORY_TTL: Duration = Duration::from_secs(5 * 60);

/// Persistent-tier TTL (24 hours)
pub const DEFAULT_PERSISTENT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Memory-tier entry cap
pub const DEFAULT_MEMORY_CAPACITY: usize = 100;

/// Fraction of the memory tier evicted per eviction pass.
///
/// Evicting a band rather than one entry amortizes eviction cost
/// during bursts of distinct queries.
pub const EVICTION_BAND_FRACTION: f64 = 0.20;

// =============================================================================
// Tests
// =============================================================================
