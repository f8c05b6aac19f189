//! Offline Storage Quota Management
//!
//! Keeps the offline footprint under configured limits: measures byte
//! usage per data category, gates new writes with a pure permission
//! decision, and runs a prioritized cleanup pipeline under capacity
//! pressure while protecting unsynced and recent data.
//!
//! # Cleanup pipeline (fixed priority order)
//!
//! ```text
//! 1. Clear temporary caches            (lowest risk)
//! 2. Remove stale synced records       (older than 2x retention)
//! 3. Compress old photos               (under photo-quota pressure)
//! 4. Archive old journal entries       (older than 3x retention)
//! 5. LRU sweep of access-tracked data  (oldest 20%, >10 tracked)
//! ```
//!
//! Steps fail independently: one failing strategy never blocks the
//! others, and partial success is success.

mod compress;
mod config;
mod manager;
mod records;
mod stats;

pub use compress::Compressor;
pub use config::{StorageQuotaConfig, CHILD_AGE_THRESHOLD_YEARS, CRITICAL_RETENTION_DAYS};
pub use manager::{DeviceSpaceProbe, FixedSpaceProbe, StorageQuotaManager};
pub use records::{DataCategory, RecordVault, StoredFile, StoredRecord};
pub use stats::{
    CleanupRecommendation, CleanupResult, CleanupStep, CleanupStrategy, PermissionDenial,
    StoragePermission, StorageStats, UserStorageInfo,
};
