//! Herdline - Offline-First Timeline Data Access Layer
//!
//! Cached, paginated access to a remote activity timeline for a
//! farm-management client that must keep working offline: journal
//! entries and expense records are fetched page by page, cached across
//! two tiers, and kept under a storage quota with prioritized cleanup.
//!
//! # Architecture
//!
//! Three cooperating layers sit between the UI and the backend:
//!
//! ```text
//! UI ──► TimelinePaginator ──► TieredCache ──► RemoteQuerySource
//!              │                   │
//!              │             L1 MemoryCache (5 min TTL, LRU)
//!              │             L2 PersistentCache (24 h TTL)
//!              │                   │
//!              │             KeyValueStore ◄── StorageQuotaManager
//!              └─ PrefetchScheduler (debounced read-ahead)
//! ```
//!
//! # Modules
//!
//! - [`cache`] - Two-tier page cache (memory + persistent)
//! - [`error`] - Error types
//! - [`model`] - Timeline items, filters, and cache keys
//! - [`pagination`] - Page loading, deduplication, and prefetch
//! - [`quota`] - Storage quota measurement, gating, and cleanup
//! - [`source`] - Remote query source trait
//! - [`store`] - Durable key-value store trait

pub mod cache;
pub mod error;
pub mod model;
pub mod pagination;
pub mod quota;
pub mod source;
pub mod store;

// Re-export commonly used types
pub use cache::{CacheHitTier, TieredCache, TieredCacheConfig};
pub use error::{Error, Result};
pub use model::{TimelineFilter, TimelineItem, TimelineKind, TimelineResponse};
pub use pagination::{PaginatorConfig, TimelinePaginator};
pub use quota::{StorageQuotaConfig, StorageQuotaManager, StoragePermission};
pub use source::RemoteQuerySource;
pub use store::KeyValueStore;
