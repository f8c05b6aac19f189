//! Durable Key-Value Store
//!
//! Pluggable string key-value backend shared by the persistent cache
//! tier and the quota manager, each under its own key namespace. Other
//! unrelated application state may coexist in the same store; no
//! component assumes exclusive ownership.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{Error, Result};

/// Durable key-value store trait
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value, replacing any existing one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a key; returns whether it existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// List all keys currently present
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory store backend for testing
///
/// DashMap keeps concurrent puts to the same key last-write-wins with
/// no cross-operation locking, matching the durable backends.
pub struct InMemoryKeyValueStore {
    storage: DashMap<String, String>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self {
            storage: DashMap::new(),
            reads: AtomicU64::new(0),
            writes: AtomicU64::new(0),
        }
    }
}

impl InMemoryKeyValueStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Read operations performed
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Write operations performed
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Number of keys present
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.storage.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.storage.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.storage.iter().map(|e| e.key().clone()).collect())
    }
}

/// File-backed store: one file per key under a base directory.
///
/// Keys are percent-encoded into file names, so namespace prefixes and
/// signature separators survive the round trip.
pub struct FileKeyValueStore {
    base_dir: PathBuf,
}

impl FileKeyValueStore {
    /// Open a store rooted at `base_dir`, creating the directory if needed
    pub async fn open(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        tokio::fs::create_dir_all(&base_dir).await?;
        Ok(Self { base_dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.base_dir.join(urlencoding::encode(key).into_owned())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        tokio::fs::write(self.path_for(key), value)
            .await
            .map_err(|e| Error::Store(e.to_string()))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::Store(e.to_string())),
        }
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.base_dir)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| Error::Store(e.to_string()))? {
            let name = entry.file_name();
            let encoded = name.to_string_lossy();
            match urlencoding::decode(&encoded) {
                Ok(decoded) => keys.push(decoded.into_owned()),
                // Foreign files in the directory are not ours to report
                Err(_) => continue,
            }
        }
        Ok(keys)
    }
}

// =============================================================================
// Tests
// =============================================================================
