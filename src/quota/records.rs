//! Offline Record Inventory
//!
//! The quota manager's view of what is actually stored: structured
//! records live in the durable key-value store under per-category
//! `record_` namespaces; photos and temporary caches are files under
//! category-specific directories; archives are LZ4 blobs under their
//! own directory. All namespaces are disjoint from the timeline cache.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::store::KeyValueStore;

/// Offline data category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataCategory {
    /// Journal entries
    Journal,
    /// Animal records
    Animal,
    /// Photo files
    Photo,
    /// Health records
    Health,
    /// Weight records
    Weight,
    /// Temporary cache files
    TempCache,
}

impl DataCategory {
    /// Category name used in key prefixes and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::Journal => "journal",
            DataCategory::Animal => "animal",
            DataCategory::Photo => "photo",
            DataCategory::Health => "health",
            DataCategory::Weight => "weight",
            DataCategory::TempCache => "temp_cache",
        }
    }

    /// All categories
    pub fn all() -> [Self; 6] {
        [
            DataCategory::Journal,
            DataCategory::Animal,
            DataCategory::Photo,
            DataCategory::Health,
            DataCategory::Weight,
            DataCategory::TempCache,
        ]
    }

    /// Categories stored as records in the key-value store
    pub fn kv_backed() -> [Self; 4] {
        [
            DataCategory::Journal,
            DataCategory::Animal,
            DataCategory::Health,
            DataCategory::Weight,
        ]
    }

    /// Key namespace prefix for this category's records
    pub fn record_prefix(&self) -> String {
        format!("record_{}_", self.as_str())
    }
}

impl std::fmt::Display for DataCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured record persisted for offline use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Record identifier
    pub id: String,
    /// Owning user
    pub user_id: String,
    /// Category the record belongs to
    pub category: DataCategory,
    /// Creation timestamp (drives retention decisions)
    pub created_at: DateTime<Utc>,
    /// Whether the record has been synced to the backend
    pub synced: bool,
    /// Serialized record body
    pub body: String,
}

impl StoredRecord {
    /// The durable-store key for this record
    pub fn key(&self) -> String {
        record_key(self.category, &self.id)
    }

    /// Age in whole days
    pub fn age_days(&self) -> i64 {
        (Utc::now() - self.created_at).num_days()
    }
}

/// Durable-store key for a record
pub fn record_key(category: DataCategory, id: &str) -> String {
    format!("{}{}", category.record_prefix(), id)
}

/// Durable-store key for a user's stored birth date
pub fn birthdate_key(user_id: &str) -> String {
    format!("profile_birthdate_{user_id}")
}

/// A photo or temp-cache file with its size and modification time
#[derive(Debug, Clone)]
pub struct StoredFile {
    /// Absolute path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// Last modification time
    pub modified: SystemTime,
}

impl StoredFile {
    /// Age in whole days derived from the modification time
    pub fn age_days(&self) -> i64 {
        let modified: DateTime<Utc> = self.modified.into();
        (Utc::now() - modified).num_days()
    }

    /// File name as UTF-8 (lossy)
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Inventory over the durable store and the category directories
pub struct RecordVault {
    store: Arc<dyn KeyValueStore>,
    photo_dir: PathBuf,
    temp_dir: PathBuf,
    archive_dir: PathBuf,
}

impl RecordVault {
    /// Open a vault, creating the category directories if needed
    pub async fn open(
        store: Arc<dyn KeyValueStore>,
        photo_dir: impl Into<PathBuf>,
        temp_dir: impl Into<PathBuf>,
        archive_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let vault = Self {
            store,
            photo_dir: photo_dir.into(),
            temp_dir: temp_dir.into(),
            archive_dir: archive_dir.into(),
        };
        tokio::fs::create_dir_all(&vault.photo_dir).await?;
        tokio::fs::create_dir_all(&vault.temp_dir).await?;
        tokio::fs::create_dir_all(&vault.archive_dir).await?;
        Ok(vault)
    }

    /// The underlying durable store
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Photo directory
    pub fn photo_dir(&self) -> &Path {
        &self.photo_dir
    }

    /// Temp-cache directory
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Archive directory
    pub fn archive_dir(&self) -> &Path {
        &self.archive_dir
    }

    /// Persist a record
    pub async fn put_record(&self, record: &StoredRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.store.set(&record.key(), &raw).await
    }

    /// Load one record
    pub async fn get_record(&self, category: DataCategory, id: &str) -> Result<Option<StoredRecord>> {
        match self.store.get(&record_key(category, id)).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Delete one record; returns the bytes freed
    pub async fn delete_record(&self, category: DataCategory, id: &str) -> Result<u64> {
        let key = record_key(category, id);
        let size = self
            .store
            .get(&key)
            .await?
            .map(|raw| raw.len() as u64)
            .unwrap_or(0);
        self.store.remove(&key).await?;
        Ok(size)
    }

    /// All parseable records in one key-value-backed category.
    ///
    /// Unparseable records are skipped with a warning; measuring usage
    /// must not fail because one row is corrupt.
    pub async fn records_in(&self, category: DataCategory) -> Result<Vec<StoredRecord>> {
        let prefix = category.record_prefix();
        let mut records = Vec::new();
        for key in self.store.keys().await? {
            if !key.starts_with(&prefix) {
                continue;
            }
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            match serde_json::from_str::<StoredRecord>(&raw) {
                Ok(record) => records.push(record),
                Err(e) => warn!(key, error = %e, "skipping unparseable stored record"),
            }
        }
        Ok(records)
    }

    /// All records across the key-value-backed categories
    pub async fn all_records(&self) -> Result<Vec<StoredRecord>> {
        let mut records = Vec::new();
        for category in DataCategory::kv_backed() {
            records.extend(self.records_in(category).await?);
        }
        Ok(records)
    }

    /// Byte usage of one category
    pub async fn category_bytes(&self, category: DataCategory) -> Result<u64> {
        match category {
            DataCategory::Photo => dir_bytes(&self.photo_dir).await,
            DataCategory::TempCache => dir_bytes(&self.temp_dir).await,
            _ => {
                let prefix = category.record_prefix();
                let mut total = 0u64;
                for key in self.store.keys().await? {
                    if key.starts_with(&prefix) {
                        if let Some(raw) = self.store.get(&key).await? {
                            total += raw.len() as u64;
                        }
                    }
                }
                Ok(total)
            }
        }
    }

    /// Enumerate photo files with sizes and modification times
    pub async fn photo_files(&self) -> Result<Vec<StoredFile>> {
        list_files(&self.photo_dir).await
    }

    /// Write a photo file; the naming convention is
    /// `<user_id>_<record_id>[.ext]`
    pub async fn write_photo(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.photo_dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }

    /// Delete every file in the temp-cache directory; returns bytes freed
    pub async fn clear_temp_dir(&self) -> Result<u64> {
        let mut freed = 0u64;
        for file in list_files(&self.temp_dir).await? {
            tokio::fs::remove_file(&file.path).await?;
            freed += file.size;
        }
        Ok(freed)
    }

    /// Archive blob path for a record
    pub fn archive_path(&self, user_id: &str, id: &str) -> PathBuf {
        self.archive_dir.join(format!("{user_id}_{id}.lz4"))
    }

    /// Enumerate archive blobs
    pub async fn archive_files(&self) -> Result<Vec<StoredFile>> {
        list_files(&self.archive_dir).await
    }
}

/// Total bytes of the regular files directly under a directory
pub async fn dir_bytes(dir: &Path) -> Result<u64> {
    Ok(list_files(dir).await?.iter().map(|f| f.size).sum())
}

/// Regular files directly under a directory
pub async fn list_files(dir: &Path) -> Result<Vec<StoredFile>> {
    let mut files = Vec::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
        Err(e) => return Err(Error::Io(e)),
    };
    while let Some(entry) = entries.next_entry().await? {
        let meta = entry.metadata().await?;
        if meta.is_file() {
            files.push(StoredFile {
                path: entry.path(),
                size: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
    }
    Ok(files)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryKeyValueStore;
    use chrono::Duration;

    async fn vault_in(dir: &Path) -> RecordVault {
        RecordVault::open(
            Arc::new(InMemoryKeyValueStore::new()),
            dir.join("photos"),
            dir.join("temp"),
            dir.join("archive"),
        )
        .await
        .unwrap()
    }

    fn record(id: &str, category: DataCategory, days_old: i64, synced: bool) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            category,
            created_at: Utc::now() - Duration::days(days_old),
            synced,
            body: "x".repeat(100),
        }
    }

    #[tokio::test]
    async fn test_record_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        let journal = record("j1", DataCategory::Journal, 5, true);
        vault.put_record(&journal).await.unwrap();

        let loaded = vault
            .get_record(DataCategory::Journal, "j1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, journal);
        assert_eq!(loaded.age_days(), 5);
    }

    #[tokio::test]
    async fn test_records_in_filters_by_category() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        vault.put_record(&record("j1", DataCategory::Journal, 1, true)).await.unwrap();
        vault.put_record(&record("w1", DataCategory::Weight, 1, true)).await.unwrap();

        let journals = vault.records_in(DataCategory::Journal).await.unwrap();
        assert_eq!(journals.len(), 1);
        assert_eq!(journals[0].id, "j1");

        assert_eq!(vault.all_records().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_record_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        vault.put_record(&record("good", DataCategory::Journal, 1, true)).await.unwrap();
        vault
            .store()
            .set("record_journal_bad", "{ not json")
            .await
            .unwrap();

        let records = vault.records_in(DataCategory::Journal).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "good");
    }

    #[tokio::test]
    async fn test_delete_record_reports_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        let journal = record("j1", DataCategory::Journal, 1, true);
        vault.put_record(&journal).await.unwrap();

        let freed = vault.delete_record(DataCategory::Journal, "j1").await.unwrap();
        assert!(freed > 100);
        assert!(vault.get_record(DataCategory::Journal, "j1").await.unwrap().is_none());

        // Deleting again frees nothing
        assert_eq!(vault.delete_record(DataCategory::Journal, "j1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_category_bytes_kv_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        vault.put_record(&record("j1", DataCategory::Journal, 1, true)).await.unwrap();
        vault.write_photo("user-1_p1.jpg", &[0u8; 2048]).await.unwrap();
        tokio::fs::write(vault.temp_dir().join("scratch.bin"), [0u8; 512])
            .await
            .unwrap();

        assert!(vault.category_bytes(DataCategory::Journal).await.unwrap() > 100);
        assert_eq!(vault.category_bytes(DataCategory::Photo).await.unwrap(), 2048);
        assert_eq!(vault.category_bytes(DataCategory::TempCache).await.unwrap(), 512);
        assert_eq!(vault.category_bytes(DataCategory::Animal).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_clear_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;

        tokio::fs::write(vault.temp_dir().join("a.tmp"), [0u8; 100]).await.unwrap();
        tokio::fs::write(vault.temp_dir().join("b.tmp"), [0u8; 200]).await.unwrap();

        assert_eq!(vault.clear_temp_dir().await.unwrap(), 300);
        assert_eq!(vault.category_bytes(DataCategory::TempCache).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_dir_counts_zero() {
        let dir = tempfile::tempdir().unwrap();
        let vault = vault_in(dir.path()).await;
        tokio::fs::remove_dir_all(vault.photo_dir()).await.unwrap();

        assert_eq!(vault.category_bytes(DataCategory::Photo).await.unwrap(), 0);
    }

    #[test]
    fn test_key_namespaces_disjoint_from_cache() {
        for category in DataCategory::kv_backed() {
            assert!(!category
                .record_prefix()
                .starts_with(crate::model::TIMELINE_CACHE_PREFIX));
        }
        assert!(birthdate_key("u").starts_with("profile_"));
    }
}
