//! Storage Quota Configuration
//!
//! Per-install, overridable byte ceilings and thresholds. Any positive
//! ceilings are valid; the defaults target a mid-range phone.

use crate::error::{Error, Result};

/// Data is always protected from cleanup inside this window, regardless
/// of sync state
pub const CRITICAL_RETENTION_DAYS: i64 = 30;

/// Users younger than this get the stricter child storage policy
pub const CHILD_AGE_THRESHOLD_YEARS: i64 = 13;

/// Storage quota configuration
#[derive(Debug, Clone)]
pub struct StorageQuotaConfig {
    /// Overall offline footprint ceiling
    pub total_quota_bytes: u64,
    /// Photo category ceiling
    pub photo_quota_bytes: u64,
    /// Structured-record ceiling (journal, animal, health, weight)
    pub data_quota_bytes: u64,
    /// Temporary cache ceiling
    pub cache_quota_bytes: u64,
    /// Usage fraction at which a warning is attached (0.0 - 1.0)
    pub warn_threshold: f64,
    /// Usage fraction at which cleanup becomes mandatory (0.0 - 1.0)
    pub cleanup_threshold: f64,
    /// Always-protected retention window in days
    pub critical_retention_days: i64,
    /// Photo usage fraction of the photo quota above which old photos
    /// are compressed
    pub photo_pressure_threshold: f64,
    /// Minimum tracked items before the LRU sweep may run
    pub lru_min_tracked: usize,
    /// Fraction of tracked items removed per LRU sweep
    pub lru_band: f64,
    /// Stricter total ceiling applied to users under the child age
    /// threshold
    pub child_quota_bytes: u64,
    /// Shorter retention window for child accounts, in days
    pub child_retention_days: i64,
    /// Conservative device-available estimate used when probing fails
    pub fallback_device_available: u64,
}

impl Default for StorageQuotaConfig {
    fn default() -> Self {
        Self {
            total_quota_bytes: 500 * 1024 * 1024,
            photo_quota_bytes: 300 * 1024 * 1024,
            data_quota_bytes: 150 * 1024 * 1024,
            cache_quota_bytes: 50 * 1024 * 1024,
            warn_threshold: 0.80,
            cleanup_threshold: 0.90,
            critical_retention_days: CRITICAL_RETENTION_DAYS,
            photo_pressure_threshold: 0.80,
            lru_min_tracked: 10,
            lru_band: 0.20,
            child_quota_bytes: 100 * 1024 * 1024,
            child_retention_days: 7,
            fallback_device_available: 1024 * 1024 * 1024,
        }
    }
}

impl StorageQuotaConfig {
    /// Validate ceilings and thresholds
    pub fn validate(&self) -> Result<()> {
        if self.total_quota_bytes == 0
            || self.photo_quota_bytes == 0
            || self.data_quota_bytes == 0
            || self.cache_quota_bytes == 0
        {
            return Err(Error::Config("quota ceilings must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.warn_threshold)
            || !(0.0..=1.0).contains(&self.cleanup_threshold)
        {
            return Err(Error::Config(
                "thresholds must be within 0.0 - 1.0".to_string(),
            ));
        }
        if self.warn_threshold > self.cleanup_threshold {
            return Err(Error::Config(
                "warn threshold must not exceed cleanup threshold".to_string(),
            ));
        }
        if self.critical_retention_days <= 0 {
            return Err(Error::Config("retention window must be positive".to_string()));
        }
        Ok(())
    }

    /// Age in days beyond which synced records become removable (2x the
    /// retention window)
    pub fn stale_synced_days(&self) -> i64 {
        self.critical_retention_days * 2
    }

    /// Age in days beyond which journal entries become archivable (3x
    /// the retention window)
    pub fn archive_days(&self) -> i64 {
        self.critical_retention_days * 3
    }
}

// =============================================================================
// Tests
// =============================================================================
