//! Storage Quota Manager
//!
//! Owns the quota policy over a [`RecordVault`]: usage measurement,
//! write gating, the prioritized cleanup pipeline, access tracking for
//! the LRU sweep, per-user policy (including the stricter child
//! policy), and compliance-driven erasure.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

use super::compress::{Compressor, TYPICAL_LZ4_RATIO};
use super::config::StorageQuotaConfig;
use super::records::{birthdate_key, DataCategory, RecordVault};
use super::stats::{
    CleanupRecommendation, CleanupResult, CleanupStep, CleanupStrategy, PermissionDenial,
    StoragePermission, StorageStats, UserStorageInfo,
};

/// Source of the device's available-space figure.
///
/// Kept behind a trait so platforms can plug their own probe in and
/// tests can force exhaustion or failure.
pub trait DeviceSpaceProbe: Send + Sync {
    /// Bytes currently available on the device
    fn available_bytes(&self) -> Result<u64>;
}

/// Probe returning a fixed figure
pub struct FixedSpaceProbe {
    bytes: u64,
}

impl FixedSpaceProbe {
    /// Create a probe that always reports `bytes` available
    pub fn new(bytes: u64) -> Self {
        Self { bytes }
    }
}

impl DeviceSpaceProbe for FixedSpaceProbe {
    fn available_bytes(&self) -> Result<u64> {
        Ok(self.bytes)
    }
}

/// One access-tracked item
struct AccessMark {
    category: DataCategory,
    id: String,
    tick: u64,
}

/// Storage quota manager
pub struct StorageQuotaManager {
    vault: RecordVault,
    probe: Arc<dyn DeviceSpaceProbe>,
    config: StorageQuotaConfig,
    compressor: Compressor,
    /// Record key -> access mark; recency uses a logical tick so sweep
    /// order is total even within one second
    access_log: DashMap<String, AccessMark>,
    tick: AtomicU64,
}

impl std::fmt::Debug for StorageQuotaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageQuotaManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StorageQuotaManager {
    /// Create a manager over a vault with the given probe and config
    pub fn new(
        vault: RecordVault,
        probe: Arc<dyn DeviceSpaceProbe>,
        config: StorageQuotaConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vault,
            probe,
            config,
            compressor: Compressor::new(),
            access_log: DashMap::new(),
            tick: AtomicU64::new(0),
        })
    }

    /// The vault this manager measures and cleans
    pub fn vault(&self) -> &RecordVault {
        &self.vault
    }

    /// The active configuration
    pub fn config(&self) -> &StorageQuotaConfig {
        &self.config
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    /// Measure per-category and aggregate usage.
    ///
    /// A failing device probe degrades to the configured conservative
    /// fallback rather than failing the measurement.
    pub async fn storage_stats(&self) -> Result<StorageStats> {
        let journal_bytes = self.vault.category_bytes(DataCategory::Journal).await?;
        let animal_bytes = self.vault.category_bytes(DataCategory::Animal).await?;
        let photo_bytes = self.vault.category_bytes(DataCategory::Photo).await?;
        let health_bytes = self.vault.category_bytes(DataCategory::Health).await?;
        let weight_bytes = self.vault.category_bytes(DataCategory::Weight).await?;
        let temp_cache_bytes = self.vault.category_bytes(DataCategory::TempCache).await?;

        let total_used = journal_bytes
            + animal_bytes
            + photo_bytes
            + health_bytes
            + weight_bytes
            + temp_cache_bytes;

        let device_available = match self.probe.available_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "device space probe failed, using fallback estimate");
                self.config.fallback_device_available
            }
        };

        let usage_percentage = total_used as f64 / self.config.total_quota_bytes as f64;

        Ok(StorageStats {
            journal_bytes,
            animal_bytes,
            photo_bytes,
            health_bytes,
            weight_bytes,
            temp_cache_bytes,
            total_used,
            device_available,
            usage_percentage,
            show_warning: usage_percentage >= self.config.warn_threshold,
            needs_cleanup: usage_percentage >= self.config.cleanup_threshold,
        })
    }

    // =========================================================================
    // Write gating
    // =========================================================================

    /// Decide whether `incoming_bytes` of `category` data may be stored.
    ///
    /// The decision itself never fails: a denied write carries a
    /// structured reason, and a cleanup suggestion is attached whenever
    /// usage is past the warning threshold, allowed or not.
    pub async fn can_store(
        &self,
        category: DataCategory,
        incoming_bytes: u64,
    ) -> Result<StoragePermission> {
        let stats = self.storage_stats().await?;
        Ok(evaluate_permission(&self.config, &stats, category, incoming_bytes))
    }

    // =========================================================================
    // Cleanup pipeline
    // =========================================================================

    /// Run the prioritized cleanup pipeline.
    ///
    /// A no-op below the cleanup threshold unless `force` is set. Each
    /// strategy runs even when an earlier one failed; failures are
    /// recorded per step and partial success is success.
    pub async fn smart_cleanup(&self, force: bool) -> Result<CleanupResult> {
        let stats = self.storage_stats().await?;
        if !force && !stats.needs_cleanup {
            debug!(
                usage = stats.usage_percentage,
                "below cleanup threshold, skipping"
            );
            return Ok(CleanupResult::not_needed());
        }

        let protected = self.protected_ids().await?;
        let mut steps = Vec::with_capacity(5);
        let mut total_freed = 0u64;

        let pipeline: [(CleanupStrategy, Result<u64>); 5] = [
            (CleanupStrategy::TempCache, self.clear_temp_caches().await),
            (
                CleanupStrategy::StaleSynced,
                self.remove_stale_synced(&protected).await,
            ),
            (
                CleanupStrategy::PhotoCompression,
                self.compress_old_photos(&stats, &protected).await,
            ),
            (
                CleanupStrategy::JournalArchival,
                self.archive_old_journals(&protected).await,
            ),
            (CleanupStrategy::LruSweep, self.lru_sweep(&protected).await),
        ];

        for (strategy, outcome) in pipeline {
            let step = match outcome {
                Ok(bytes_freed) => {
                    total_freed += bytes_freed;
                    CleanupStep {
                        strategy,
                        bytes_freed,
                        error: None,
                    }
                }
                Err(e) => {
                    warn!(strategy = %strategy, error = %e, "cleanup strategy failed");
                    CleanupStep {
                        strategy,
                        bytes_freed: 0,
                        error: Some(e.to_string()),
                    }
                }
            };
            steps.push(step);
        }

        info!(bytes_freed = total_freed, "cleanup pass finished");
        Ok(CleanupResult {
            performed: true,
            bytes_freed: total_freed,
            steps,
            message: format!("freed {total_freed} bytes"),
        })
    }

    /// Step 1: clear the temporary cache directory
    async fn clear_temp_caches(&self) -> Result<u64> {
        self.vault.clear_temp_dir().await
    }

    /// Step 2: remove synced records older than twice the retention
    /// window
    async fn remove_stale_synced(&self, protected: &HashSet<String>) -> Result<u64> {
        let mut freed = 0u64;
        for record in self.vault.all_records().await? {
            if !record.synced
                || record.age_days() <= self.config.stale_synced_days()
                || protected.contains(&record.id)
            {
                continue;
            }
            freed += self.vault.delete_record(record.category, &record.id).await?;
            self.access_log.remove(&record.key());
        }
        Ok(freed)
    }

    /// Step 3: compress photos older than the retention window, but
    /// only while the photo category itself is under pressure
    async fn compress_old_photos(
        &self,
        stats: &StorageStats,
        protected: &HashSet<String>,
    ) -> Result<u64> {
        let pressure = stats.photo_bytes as f64 / self.config.photo_quota_bytes as f64;
        if pressure < self.config.photo_pressure_threshold {
            return Ok(0);
        }

        let mut freed = 0u64;
        for file in self.vault.photo_files().await? {
            let name = file.file_name();
            if name.ends_with(".lz4") || file.age_days() <= self.config.critical_retention_days {
                continue;
            }
            if let Some(record_id) = photo_record_id(&name) {
                if protected.contains(record_id) {
                    continue;
                }
            }

            let original = tokio::fs::read(&file.path).await?;
            let compressed = self.compressor.compress(&original)?;
            if compressed.len() as u64 >= file.size {
                continue;
            }
            let compressed_path = file.path.with_file_name(format!("{name}.lz4"));
            tokio::fs::write(&compressed_path, &compressed).await?;
            tokio::fs::remove_file(&file.path).await?;
            freed += file.size - compressed.len() as u64;
        }
        Ok(freed)
    }

    /// Step 4: move journal entries older than three retention windows
    /// out of the record store into compressed archive blobs
    async fn archive_old_journals(&self, protected: &HashSet<String>) -> Result<u64> {
        let mut freed = 0u64;
        for record in self.vault.records_in(DataCategory::Journal).await? {
            if record.age_days() <= self.config.archive_days() || protected.contains(&record.id) {
                continue;
            }
            let raw = serde_json::to_string(&record)?;
            let compressed = self.compressor.compress(raw.as_bytes())?;
            let path = self.vault.archive_path(&record.user_id, &record.id);
            tokio::fs::write(&path, &compressed).await?;
            let removed = self.vault.delete_record(DataCategory::Journal, &record.id).await?;
            self.access_log.remove(&record.key());
            freed += removed.saturating_sub(compressed.len() as u64);
        }
        Ok(freed)
    }

    /// Step 5: remove the least-recently-accessed band of tracked
    /// records, never touching protected ones
    async fn lru_sweep(&self, protected: &HashSet<String>) -> Result<u64> {
        let tracked = self.access_log.len();
        if tracked <= self.config.lru_min_tracked {
            return Ok(0);
        }

        let mut marks: Vec<(String, DataCategory, String, u64)> = self
            .access_log
            .iter()
            .map(|entry| {
                (
                    entry.key().clone(),
                    entry.value().category,
                    entry.value().id.clone(),
                    entry.value().tick,
                )
            })
            .collect();
        marks.sort_by_key(|(_, _, _, tick)| *tick);

        let band = ((tracked as f64 * self.config.lru_band).ceil() as usize).max(1);
        let mut removed = 0usize;
        let mut freed = 0u64;
        for (key, category, id, _) in marks {
            if removed >= band {
                break;
            }
            if protected.contains(&id) {
                continue;
            }
            freed += self.vault.delete_record(category, &id).await?;
            self.access_log.remove(&key);
            removed += 1;
        }
        Ok(freed)
    }

    // =========================================================================
    // Protection and access tracking
    // =========================================================================

    /// Record ids that must never be removed by cleanup: anything
    /// unsynced, plus anything inside the retention window. Recomputed
    /// fresh on every call so a record that just synced or just aged
    /// out is reclassified immediately.
    pub async fn protected_ids(&self) -> Result<HashSet<String>> {
        let mut protected = HashSet::new();
        for record in self.vault.all_records().await? {
            if !record.synced || record.age_days() < self.config.critical_retention_days {
                protected.insert(record.id);
            }
        }
        Ok(protected)
    }

    /// Mark a record as just accessed, feeding the LRU sweep
    pub fn track_access(&self, category: DataCategory, id: &str) {
        let tick = self.tick.fetch_add(1, Ordering::Relaxed);
        self.access_log.insert(
            super::records::record_key(category, id),
            AccessMark {
                category,
                id: id.to_string(),
                tick,
            },
        );
    }

    /// Number of access-tracked items
    pub fn tracked_items(&self) -> usize {
        self.access_log.len()
    }

    // =========================================================================
    // Per-user policy
    // =========================================================================

    /// Per-user usage breakdown with the applicable policy.
    ///
    /// Users under the child age threshold get the stricter quota and
    /// the shorter retention window; with no stored birth date the
    /// adult policy applies.
    pub async fn user_storage_info(&self, user_id: &str) -> Result<UserStorageInfo> {
        let mut by_category: HashMap<&'static str, u64> = HashMap::new();
        for record in self.vault.all_records().await? {
            if record.user_id != user_id {
                continue;
            }
            let bytes = serde_json::to_string(&record)?.len() as u64;
            *by_category.entry(record.category.as_str()).or_default() += bytes;
        }

        let file_prefix = format!("{user_id}_");
        for file in self.vault.photo_files().await? {
            if file.file_name().starts_with(&file_prefix) {
                *by_category.entry(DataCategory::Photo.as_str()).or_default() += file.size;
            }
        }
        for file in self.vault.archive_files().await? {
            if file.file_name().starts_with(&file_prefix) {
                *by_category.entry("archive").or_default() += file.size;
            }
        }

        let total_bytes = by_category.values().sum();
        let is_minor = self.is_minor(user_id).await?;
        let (quota_bytes, retention_days) = if is_minor {
            (
                self.config.child_quota_bytes.min(self.config.total_quota_bytes),
                self.config.child_retention_days,
            )
        } else {
            (self.config.total_quota_bytes, self.config.critical_retention_days)
        };

        Ok(UserStorageInfo {
            user_id: user_id.to_string(),
            total_bytes,
            by_category: by_category
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            quota_bytes,
            retention_days,
            is_minor,
        })
    }

    /// Whether the stricter child policy applies to this user
    async fn is_minor(&self, user_id: &str) -> Result<bool> {
        let Some(raw) = self.vault.store().get(&birthdate_key(user_id)).await? else {
            return Ok(false);
        };
        let Ok(birthdate) = NaiveDate::parse_from_str(&raw, "%Y-%m-%d") else {
            warn!(user_id, "unparseable stored birth date, applying adult policy");
            return Ok(false);
        };
        let age_years = chrono::Utc::now()
            .date_naive()
            .years_since(birthdate)
            .unwrap_or(0);
        Ok(i64::from(age_years) < super::config::CHILD_AGE_THRESHOLD_YEARS)
    }

    /// Completely erase a user's stored data: records, photos, archive
    /// blobs, and profile keys.
    ///
    /// Unlike cleanup, partial erasure is failure: every removal is
    /// attempted, then any failure at all surfaces as an error.
    pub async fn clear_user_data(&self, user_id: &str) -> Result<()> {
        let mut failures: Vec<String> = Vec::new();

        let records = self
            .vault
            .all_records()
            .await
            .map_err(|e| erasure_error(user_id, &format!("listing records: {e}")))?;
        for record in records {
            if record.user_id != user_id {
                continue;
            }
            if let Err(e) = self.vault.delete_record(record.category, &record.id).await {
                failures.push(format!("record {}: {e}", record.id));
            }
            self.access_log.remove(&record.key());
        }

        let file_prefix = format!("{user_id}_");
        for dir_files in [
            self.vault.photo_files().await,
            self.vault.archive_files().await,
        ] {
            let files =
                dir_files.map_err(|e| erasure_error(user_id, &format!("listing files: {e}")))?;
            for file in files {
                if !file.file_name().starts_with(&file_prefix) {
                    continue;
                }
                if let Err(e) = tokio::fs::remove_file(&file.path).await {
                    failures.push(format!("file {}: {e}", file.file_name()));
                }
            }
        }

        if let Err(e) = self.vault.store().remove(&birthdate_key(user_id)).await {
            failures.push(format!("profile: {e}"));
        }

        if failures.is_empty() {
            info!(user_id, "user data erased");
            Ok(())
        } else {
            Err(erasure_error(user_id, &failures.join("; ")))
        }
    }

    // =========================================================================
    // Recommendations
    // =========================================================================

    /// Estimate what each cleanup strategy would reclaim, without
    /// mutating anything. Compression strategies use the typical LZ4
    /// ratio for their estimates.
    pub async fn cleanup_recommendations(&self) -> Result<Vec<CleanupRecommendation>> {
        let stats = self.storage_stats().await?;
        let protected = self.protected_ids().await?;
        let mut recommendations = Vec::new();

        if stats.temp_cache_bytes > 0 {
            recommendations.push(CleanupRecommendation {
                strategy: CleanupStrategy::TempCache,
                estimated_bytes: stats.temp_cache_bytes,
                description: "clear temporary caches".to_string(),
            });
        }

        let mut stale_bytes = 0u64;
        let mut archivable_bytes = 0u64;
        for record in self.vault.all_records().await? {
            if protected.contains(&record.id) {
                continue;
            }
            let bytes = serde_json::to_string(&record)?.len() as u64;
            if record.synced && record.age_days() > self.config.stale_synced_days() {
                stale_bytes += bytes;
            }
            if record.category == DataCategory::Journal
                && record.age_days() > self.config.archive_days()
            {
                archivable_bytes += bytes;
            }
        }
        if stale_bytes > 0 {
            recommendations.push(CleanupRecommendation {
                strategy: CleanupStrategy::StaleSynced,
                estimated_bytes: stale_bytes,
                description: "remove old synced records".to_string(),
            });
        }

        let pressure = stats.photo_bytes as f64 / self.config.photo_quota_bytes as f64;
        if pressure >= self.config.photo_pressure_threshold {
            let mut compressible = 0u64;
            for file in self.vault.photo_files().await? {
                let name = file.file_name();
                if !name.ends_with(".lz4")
                    && file.age_days() > self.config.critical_retention_days
                {
                    compressible += file.size;
                }
            }
            let estimated = (compressible as f64 * (1.0 - TYPICAL_LZ4_RATIO)) as u64;
            if estimated > 0 {
                recommendations.push(CleanupRecommendation {
                    strategy: CleanupStrategy::PhotoCompression,
                    estimated_bytes: estimated,
                    description: "compress old photos".to_string(),
                });
            }
        }

        let archive_estimate = (archivable_bytes as f64 * (1.0 - TYPICAL_LZ4_RATIO)) as u64;
        if archive_estimate > 0 {
            recommendations.push(CleanupRecommendation {
                strategy: CleanupStrategy::JournalArchival,
                estimated_bytes: archive_estimate,
                description: "archive old journal entries".to_string(),
            });
        }

        let tracked = self.access_log.len();
        if tracked > self.config.lru_min_tracked {
            let band = ((tracked as f64 * self.config.lru_band).ceil() as usize).max(1);
            let mut marks: Vec<(DataCategory, String, u64)> = self
                .access_log
                .iter()
                .filter(|entry| !protected.contains(&entry.value().id))
                .map(|entry| (entry.value().category, entry.value().id.clone(), entry.value().tick))
                .collect();
            marks.sort_by_key(|(_, _, tick)| *tick);
            let mut sweep_bytes = 0u64;
            for (category, id, _) in marks.into_iter().take(band) {
                if let Some(record) = self.vault.get_record(category, &id).await? {
                    sweep_bytes += serde_json::to_string(&record)?.len() as u64;
                }
            }
            if sweep_bytes > 0 {
                recommendations.push(CleanupRecommendation {
                    strategy: CleanupStrategy::LruSweep,
                    estimated_bytes: sweep_bytes,
                    description: "remove least-recently-used records".to_string(),
                });
            }
        }

        Ok(recommendations)
    }
}

/// Pure permission decision over already-measured usage
fn evaluate_permission(
    config: &StorageQuotaConfig,
    stats: &StorageStats,
    category: DataCategory,
    incoming_bytes: u64,
) -> StoragePermission {
    let cleanup_suggested = stats.usage_percentage >= config.warn_threshold;

    if stats.total_used + incoming_bytes > config.total_quota_bytes {
        return StoragePermission {
            allowed: false,
            denial: Some(PermissionDenial::TotalQuotaExceeded),
            message: "storage quota exceeded, free up space to continue".to_string(),
            cleanup_suggested,
        };
    }

    let (category_used, category_quota) = match category {
        DataCategory::Photo => (stats.photo_bytes, config.photo_quota_bytes),
        DataCategory::TempCache => (stats.temp_cache_bytes, config.cache_quota_bytes),
        _ => (
            stats.journal_bytes + stats.animal_bytes + stats.health_bytes + stats.weight_bytes,
            config.data_quota_bytes,
        ),
    };
    if category_used + incoming_bytes > category_quota {
        return StoragePermission {
            allowed: false,
            denial: Some(PermissionDenial::CategoryQuotaExceeded),
            message: format!("{category} storage quota exceeded"),
            cleanup_suggested,
        };
    }

    if incoming_bytes > stats.device_available {
        return StoragePermission {
            allowed: false,
            denial: Some(PermissionDenial::DeviceSpaceExhausted),
            message: "not enough free space on this device".to_string(),
            cleanup_suggested,
        };
    }

    StoragePermission {
        allowed: true,
        denial: None,
        message: "ok".to_string(),
        cleanup_suggested,
    }
}

/// Record id encoded in a photo file name (`<user_id>_<record_id>[.ext]`)
fn photo_record_id(file_name: &str) -> Option<&str> {
    let stem = file_name.split('.').next().unwrap_or(file_name);
    stem.split_once('_').map(|(_, record_id)| record_id)
}

fn erasure_error(user_id: &str, reason: &str) -> Error {
    Error::UserDataErasure {
        user_id: user_id.to_string(),
        reason: reason.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::records::StoredRecord;
    use crate::store::InMemoryKeyValueStore;
    use assert_matches::assert_matches;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    struct FailingProbe;

    impl DeviceSpaceProbe for FailingProbe {
        fn available_bytes(&self) -> Result<u64> {
            Err(Error::Store("statfs unavailable".to_string()))
        }
    }

    struct Fixture {
        manager: StorageQuotaManager,
        _dir: tempfile::TempDir,
    }

    async fn fixture_with(config: StorageQuotaConfig) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let vault = RecordVault::open(
            Arc::new(InMemoryKeyValueStore::new()),
            dir.path().join("photos"),
            dir.path().join("temp"),
            dir.path().join("archive"),
        )
        .await
        .unwrap();
        let manager = StorageQuotaManager::new(
            vault,
            Arc::new(FixedSpaceProbe::new(10 * 1024 * 1024)),
            config,
        )
        .unwrap();
        Fixture {
            manager,
            _dir: dir,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(StorageQuotaConfig::default()).await
    }

    fn record(id: &str, category: DataCategory, days_old: i64, synced: bool) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            category,
            created_at: Utc::now() - Duration::days(days_old),
            synced,
            body: "entry body ".repeat(50),
        }
    }

    /// Backdate a file's modification time by `days`
    fn backdate(path: &std::path::Path, days: u64) {
        let mtime = std::time::SystemTime::now() - std::time::Duration::from_secs(days * 86_400);
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_times(std::fs::FileTimes::new().set_modified(mtime))
            .unwrap();
    }

    #[tokio::test]
    async fn test_stats_aggregate_categories() {
        let fx = fixture().await;
        fx.manager
            .vault()
            .put_record(&record("j1", DataCategory::Journal, 1, true))
            .await
            .unwrap();
        fx.manager
            .vault()
            .write_photo("user-1_p1.jpg", &[0u8; 4096])
            .await
            .unwrap();

        let stats = fx.manager.storage_stats().await.unwrap();
        assert!(stats.journal_bytes > 0);
        assert_eq!(stats.photo_bytes, 4096);
        assert_eq!(
            stats.total_used,
            stats.journal_bytes + stats.photo_bytes
        );
        assert!(!stats.show_warning);
        assert!(!stats.needs_cleanup);
    }

    #[tokio::test]
    async fn test_probe_failure_degrades_to_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let vault = RecordVault::open(
            Arc::new(InMemoryKeyValueStore::new()),
            dir.path().join("photos"),
            dir.path().join("temp"),
            dir.path().join("archive"),
        )
        .await
        .unwrap();
        let manager =
            StorageQuotaManager::new(vault, Arc::new(FailingProbe), StorageQuotaConfig::default())
                .unwrap();

        let stats = manager.storage_stats().await.unwrap();
        assert_eq!(
            stats.device_available,
            StorageQuotaConfig::default().fallback_device_available
        );
    }

    #[tokio::test]
    async fn test_can_store_allows_within_quota() {
        let fx = fixture().await;
        let permission = fx
            .manager
            .can_store(DataCategory::Journal, 1024)
            .await
            .unwrap();
        assert!(permission.allowed);
        assert!(permission.denial.is_none());
        assert!(!permission.cleanup_suggested);
    }

    #[tokio::test]
    async fn test_can_store_denies_total_quota() {
        let fx = fixture().await;
        let over = fx.manager.config().total_quota_bytes + 1;
        let permission = fx.manager.can_store(DataCategory::Journal, over).await.unwrap();
        assert!(!permission.allowed);
        assert_eq!(permission.denial, Some(PermissionDenial::TotalQuotaExceeded));
    }

    #[tokio::test]
    async fn test_can_store_denies_photo_category() {
        let fx = fixture().await;
        let over = fx.manager.config().photo_quota_bytes + 1;
        let permission = fx.manager.can_store(DataCategory::Photo, over).await.unwrap();
        assert!(!permission.allowed);
        assert_eq!(
            permission.denial,
            Some(PermissionDenial::CategoryQuotaExceeded)
        );
    }

    #[tokio::test]
    async fn test_can_store_denies_device_space() {
        let config = StorageQuotaConfig::default();
        let dir = tempfile::tempdir().unwrap();
        let vault = RecordVault::open(
            Arc::new(InMemoryKeyValueStore::new()),
            dir.path().join("photos"),
            dir.path().join("temp"),
            dir.path().join("archive"),
        )
        .await
        .unwrap();
        let manager =
            StorageQuotaManager::new(vault, Arc::new(FixedSpaceProbe::new(100)), config).unwrap();

        let permission = manager.can_store(DataCategory::Journal, 200).await.unwrap();
        assert!(!permission.allowed);
        assert_eq!(permission.denial, Some(PermissionDenial::DeviceSpaceExhausted));
    }

    #[tokio::test]
    async fn test_warning_attaches_cleanup_suggestion() {
        let fx = fixture_with(StorageQuotaConfig {
            total_quota_bytes: 1000,
            data_quota_bytes: 1000,
            ..StorageQuotaConfig::default()
        })
        .await;
        // 850 bytes used out of 1000 puts us past the 80% warning line
        fx.manager
            .vault()
            .store()
            .set("record_journal_big", &"x".repeat(850))
            .await
            .unwrap();

        let permission = fx.manager.can_store(DataCategory::Journal, 10).await.unwrap();
        assert!(permission.allowed);
        assert!(permission.cleanup_suggested);
    }

    #[tokio::test]
    async fn test_cleanup_noop_below_threshold() {
        let fx = fixture().await;
        let result = fx.manager.smart_cleanup(false).await.unwrap();
        assert!(!result.performed);
        assert_eq!(result.message, "no cleanup needed");
    }

    #[tokio::test]
    async fn test_forced_cleanup_clears_temp() {
        let fx = fixture().await;
        tokio::fs::write(fx.manager.vault().temp_dir().join("scratch.bin"), [0u8; 500])
            .await
            .unwrap();

        let result = fx.manager.smart_cleanup(true).await.unwrap();
        assert!(result.performed);
        assert!(result.bytes_freed >= 500);
        assert_eq!(result.steps.len(), 5);
        assert_eq!(result.steps[0].strategy, CleanupStrategy::TempCache);
        assert_eq!(result.steps[0].bytes_freed, 500);
    }

    #[tokio::test]
    async fn test_cleanup_removes_stale_synced_only() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("stale", DataCategory::Journal, 90, true)).await.unwrap();
        vault.put_record(&record("unsynced", DataCategory::Journal, 90, false)).await.unwrap();
        vault.put_record(&record("recent", DataCategory::Journal, 5, true)).await.unwrap();

        let result = fx.manager.smart_cleanup(true).await.unwrap();
        assert!(result.bytes_freed > 0);

        // Unsynced and recent records survive; only the stale journal
        // was archived or removed
        assert!(vault.get_record(DataCategory::Journal, "unsynced").await.unwrap().is_some());
        assert!(vault.get_record(DataCategory::Journal, "recent").await.unwrap().is_some());
        assert!(vault.get_record(DataCategory::Journal, "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_protected_ids_union() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("old-unsynced", DataCategory::Weight, 90, false)).await.unwrap();
        vault.put_record(&record("recent-synced", DataCategory::Weight, 5, true)).await.unwrap();
        vault.put_record(&record("old-synced", DataCategory::Weight, 90, true)).await.unwrap();

        let protected = fx.manager.protected_ids().await.unwrap();
        assert!(protected.contains("old-unsynced"));
        assert!(protected.contains("recent-synced"));
        assert!(!protected.contains("old-synced"));
    }

    #[tokio::test]
    async fn test_photo_compression_under_pressure() {
        let fx = fixture_with(StorageQuotaConfig {
            photo_quota_bytes: 10_000,
            ..StorageQuotaConfig::default()
        })
        .await;
        let vault = fx.manager.vault();

        // Compressible payload past the 80% pressure line
        let payload = b"pasture pasture pasture ".repeat(400);
        let path = vault.write_photo("user-1_old.jpg", &payload).await.unwrap();
        backdate(&path, 45);

        let result = fx.manager.smart_cleanup(true).await.unwrap();
        let photo_step = &result.steps[2];
        assert_eq!(photo_step.strategy, CleanupStrategy::PhotoCompression);
        assert!(photo_step.bytes_freed > 0);

        // Original replaced by the compressed blob
        assert!(!path.exists());
        assert!(vault.photo_dir().join("user-1_old.jpg.lz4").exists());
    }

    #[tokio::test]
    async fn test_recent_photos_not_compressed() {
        let fx = fixture_with(StorageQuotaConfig {
            photo_quota_bytes: 10_000,
            ..StorageQuotaConfig::default()
        })
        .await;
        let vault = fx.manager.vault();
        let payload = b"pasture pasture pasture ".repeat(400);
        let path = vault.write_photo("user-1_new.jpg", &payload).await.unwrap();

        fx.manager.smart_cleanup(true).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_pipeline_reclaims_ancient_synced_journal() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("ancient", DataCategory::Journal, 120, true)).await.unwrap();

        let result = fx.manager.smart_cleanup(true).await.unwrap();
        assert!(vault.get_record(DataCategory::Journal, "ancient").await.unwrap().is_none());
        assert!(result.bytes_freed > 0);
    }

    #[tokio::test]
    async fn test_archival_step_compresses_into_blob() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("arch", DataCategory::Journal, 120, true)).await.unwrap();

        let freed = fx.manager.archive_old_journals(&HashSet::new()).await.unwrap();
        assert!(freed > 0);
        assert!(vault.get_record(DataCategory::Journal, "arch").await.unwrap().is_none());

        let blob = vault.archive_path("user-1", "arch");
        assert!(blob.exists());
        let restored = Compressor::new()
            .decompress(&std::fs::read(&blob).unwrap())
            .unwrap();
        let archived: StoredRecord = serde_json::from_slice(&restored).unwrap();
        assert_eq!(archived.id, "arch");
    }

    #[tokio::test]
    async fn test_lru_sweep_respects_minimum_and_protection() {
        let fx = fixture().await;
        let vault = fx.manager.vault();

        // Below the tracked minimum: no sweep
        for i in 0..5 {
            let r = record(&format!("w{i}"), DataCategory::Weight, 40, true);
            vault.put_record(&r).await.unwrap();
            fx.manager.track_access(DataCategory::Weight, &r.id);
        }
        let result = fx.manager.smart_cleanup(true).await.unwrap();
        assert_eq!(result.steps[4].bytes_freed, 0);

        // Past the minimum: oldest 20% band goes, protected stay
        for i in 5..15 {
            let r = record(&format!("w{i}"), DataCategory::Weight, 40, true);
            vault.put_record(&r).await.unwrap();
            fx.manager.track_access(DataCategory::Weight, &r.id);
        }
        assert_eq!(fx.manager.tracked_items(), 15);

        let result = fx.manager.smart_cleanup(true).await.unwrap();
        let sweep = &result.steps[4];
        assert_eq!(sweep.strategy, CleanupStrategy::LruSweep);
        assert!(sweep.bytes_freed > 0);
        // ceil(15 * 0.2) = 3 oldest tracked records removed
        assert!(vault.get_record(DataCategory::Weight, "w0").await.unwrap().is_none());
        assert!(vault.get_record(DataCategory::Weight, "w1").await.unwrap().is_none());
        assert!(vault.get_record(DataCategory::Weight, "w2").await.unwrap().is_none());
        assert!(vault.get_record(DataCategory::Weight, "w3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_user_storage_info_adult_default() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("j1", DataCategory::Journal, 1, true)).await.unwrap();
        vault.write_photo("user-1_p1.jpg", &[0u8; 1000]).await.unwrap();
        vault.write_photo("user-2_p1.jpg", &[0u8; 9999]).await.unwrap();

        let info = fx.manager.user_storage_info("user-1").await.unwrap();
        assert!(!info.is_minor);
        assert_eq!(info.quota_bytes, fx.manager.config().total_quota_bytes);
        assert_eq!(info.retention_days, 30);
        assert_eq!(info.by_category["photo"], 1000);
        assert!(info.by_category["journal"] > 0);
    }

    #[tokio::test]
    async fn test_child_policy_applies_under_13() {
        let fx = fixture().await;
        let birthdate = (Utc::now() - Duration::days(10 * 365)).format("%Y-%m-%d");
        fx.manager
            .vault()
            .store()
            .set(&birthdate_key("kid"), &birthdate.to_string())
            .await
            .unwrap();

        let info = fx.manager.user_storage_info("kid").await.unwrap();
        assert!(info.is_minor);
        assert_eq!(info.quota_bytes, fx.manager.config().child_quota_bytes);
        assert_eq!(info.retention_days, fx.manager.config().child_retention_days);
    }

    #[tokio::test]
    async fn test_unparseable_birthdate_gets_adult_policy() {
        let fx = fixture().await;
        fx.manager
            .vault()
            .store()
            .set(&birthdate_key("user-1"), "not-a-date")
            .await
            .unwrap();

        let info = fx.manager.user_storage_info("user-1").await.unwrap();
        assert!(!info.is_minor);
    }

    #[tokio::test]
    async fn test_clear_user_data_is_complete_and_scoped() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("j1", DataCategory::Journal, 1, false)).await.unwrap();
        let mut other = record("j2", DataCategory::Journal, 1, true);
        other.user_id = "user-2".to_string();
        vault.put_record(&other).await.unwrap();
        vault.write_photo("user-1_p1.jpg", &[0u8; 100]).await.unwrap();
        vault.write_photo("user-2_p1.jpg", &[0u8; 100]).await.unwrap();
        tokio::fs::write(vault.archive_path("user-1", "old"), [0u8; 50]).await.unwrap();
        vault.store().set(&birthdate_key("user-1"), "2015-06-01").await.unwrap();

        fx.manager.clear_user_data("user-1").await.unwrap();

        // user-1 erased, including unsynced data and the profile key
        assert!(vault.get_record(DataCategory::Journal, "j1").await.unwrap().is_none());
        assert_eq!(vault.category_bytes(DataCategory::Photo).await.unwrap(), 100);
        assert!(!vault.archive_path("user-1", "old").exists());
        assert!(vault.store().get(&birthdate_key("user-1")).await.unwrap().is_none());

        // user-2 untouched
        assert!(vault.get_record(DataCategory::Journal, "j2").await.unwrap().is_some());
        assert!(vault.photo_dir().join("user-2_p1.jpg").exists());
    }

    #[tokio::test]
    async fn test_recommendations_do_not_mutate() {
        let fx = fixture().await;
        let vault = fx.manager.vault();
        vault.put_record(&record("stale", DataCategory::Journal, 90, true)).await.unwrap();
        tokio::fs::write(vault.temp_dir().join("t.bin"), [0u8; 300]).await.unwrap();

        let recommendations = fx.manager.cleanup_recommendations().await.unwrap();
        let strategies: Vec<_> = recommendations.iter().map(|r| r.strategy).collect();
        assert!(strategies.contains(&CleanupStrategy::TempCache));
        assert!(strategies.contains(&CleanupStrategy::StaleSynced));
        assert!(strategies.contains(&CleanupStrategy::JournalArchival));

        // Nothing was removed
        assert!(vault.get_record(DataCategory::Journal, "stale").await.unwrap().is_some());
        assert_eq!(vault.category_bytes(DataCategory::TempCache).await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let vault = RecordVault::open(
            Arc::new(InMemoryKeyValueStore::new()),
            dir.path().join("photos"),
            dir.path().join("temp"),
            dir.path().join("archive"),
        )
        .await
        .unwrap();
        let result = StorageQuotaManager::new(
            vault,
            Arc::new(FixedSpaceProbe::new(0)),
            StorageQuotaConfig {
                total_quota_bytes: 0,
                ..StorageQuotaConfig::default()
            },
        );
        assert_matches!(result, Err(Error::Config(_)));
    }

    proptest! {
        /// Once denied, asking for even more bytes stays denied
        #[test]
        fn prop_permission_monotone_in_size(used in 0u64..1_000_000, ask in 0u64..1_000_000, extra in 0u64..1_000_000) {
            let config = StorageQuotaConfig {
                total_quota_bytes: 500_000,
                photo_quota_bytes: 300_000,
                data_quota_bytes: 150_000,
                cache_quota_bytes: 50_000,
                ..StorageQuotaConfig::default()
            };
            let stats = StorageStats {
                journal_bytes: used,
                total_used: used,
                device_available: 400_000,
                usage_percentage: used as f64 / config.total_quota_bytes as f64,
                ..StorageStats::default()
            };
            let first = evaluate_permission(&config, &stats, DataCategory::Journal, ask);
            let second = evaluate_permission(&config, &stats, DataCategory::Journal, ask + extra);
            if !first.allowed {
                prop_assert!(!second.allowed);
            }
        }

        /// The verdict never panics and always carries a message
        #[test]
        fn prop_permission_total(used in 0u64..u32::MAX as u64, ask in 0u64..u32::MAX as u64) {
            let config = StorageQuotaConfig::default();
            let stats = StorageStats {
                photo_bytes: used,
                total_used: used,
                device_available: 1 << 30,
                usage_percentage: used as f64 / config.total_quota_bytes as f64,
                ..StorageStats::default()
            };
            let permission = evaluate_permission(&config, &stats, DataCategory::Photo, ask);
            prop_assert!(!permission.message.is_empty());
            prop_assert_eq!(permission.allowed, permission.denial.is_none());
        }
    }
}
