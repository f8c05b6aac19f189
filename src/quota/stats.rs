//! Storage Statistics and Cleanup Reporting Types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-category and aggregate storage usage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageStats {
    /// Journal entry bytes
    pub journal_bytes: u64,
    /// Animal record bytes
    pub animal_bytes: u64,
    /// Photo file bytes
    pub photo_bytes: u64,
    /// Health record bytes
    pub health_bytes: u64,
    /// Weight record bytes
    pub weight_bytes: u64,
    /// Temporary cache bytes
    pub temp_cache_bytes: u64,
    /// Sum of all categories
    pub total_used: u64,
    /// Device-available estimate (probed, or a conservative fallback)
    pub device_available: u64,
    /// Used fraction of the total quota (0.0 - 1.0+)
    pub usage_percentage: f64,
    /// Usage crossed the warning threshold
    pub show_warning: bool,
    /// Usage crossed the forced-cleanup threshold
    pub needs_cleanup: bool,
}

/// Verdict of a storage permission check.
///
/// Never an error: a denied write carries a structured reason the
/// caller can show, and a cleanup suggestion rides along whenever usage
/// is already past the warning threshold, independent of the verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePermission {
    /// Whether the write may proceed
    pub allowed: bool,
    /// Why the write was denied, when it was
    pub denial: Option<PermissionDenial>,
    /// Actionable user-facing message
    pub message: String,
    /// Usage already exceeds the warning threshold
    pub cleanup_suggested: bool,
}

/// Distinguished causes for a denied write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionDenial {
    /// The overall quota would be exceeded
    TotalQuotaExceeded,
    /// The category's own quota would be exceeded
    CategoryQuotaExceeded,
    /// The device itself lacks the space
    DeviceSpaceExhausted,
}

/// One reclaim strategy in the cleanup pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStrategy {
    /// Clear temporary caches
    TempCache,
    /// Remove old synced records
    StaleSynced,
    /// Compress old photos
    PhotoCompression,
    /// Archive old journal entries
    JournalArchival,
    /// Remove the least-recently-accessed tracked items
    LruSweep,
}

impl CleanupStrategy {
    /// Human-readable strategy name
    pub fn name(&self) -> &'static str {
        match self {
            CleanupStrategy::TempCache => "temp_cache",
            CleanupStrategy::StaleSynced => "stale_synced",
            CleanupStrategy::PhotoCompression => "photo_compression",
            CleanupStrategy::JournalArchival => "journal_archival",
            CleanupStrategy::LruSweep => "lru_sweep",
        }
    }
}

impl std::fmt::Display for CleanupStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of one cleanup strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupStep {
    /// Which strategy ran
    pub strategy: CleanupStrategy,
    /// Bytes reclaimed by this strategy
    pub bytes_freed: u64,
    /// Failure captured for this step, if any; other steps still ran
    pub error: Option<String>,
}

/// Outcome of a full cleanup pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupResult {
    /// Whether the pipeline ran at all
    pub performed: bool,
    /// Total bytes reclaimed across all steps
    pub bytes_freed: u64,
    /// Per-step outcomes in pipeline order
    pub steps: Vec<CleanupStep>,
    /// Summary message
    pub message: String,
}

impl CleanupResult {
    /// The below-threshold no-op result
    pub fn not_needed() -> Self {
        Self {
            performed: false,
            bytes_freed: 0,
            steps: Vec::new(),
            message: "no cleanup needed".to_string(),
        }
    }
}

/// Advisory estimate of what one strategy would reclaim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanupRecommendation {
    /// Strategy the estimate applies to
    pub strategy: CleanupStrategy,
    /// Estimated reclaimable bytes
    pub estimated_bytes: u64,
    /// User-facing description
    pub description: String,
}

/// Per-user storage breakdown with the applicable policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStorageInfo {
    /// The user this breakdown describes
    pub user_id: String,
    /// Total bytes attributed to the user
    pub total_bytes: u64,
    /// Bytes per category name
    pub by_category: BTreeMap<String, u64>,
    /// Effective total quota for this user
    pub quota_bytes: u64,
    /// Effective retention window in days
    pub retention_days: i64,
    /// Whether the stricter child policy applies
    pub is_minor: bool,
}

// =============================================================================
// Tests
// =============================================================================
