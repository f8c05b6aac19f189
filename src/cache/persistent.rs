//! Persistent Cache - Durable Warm Tier
//!
//! Key-to-payload map serialized into the durable key-value store under
//! the `timeline_cache_` namespace. Survives process restarts; slower
//! than the memory tier, much faster than the remote source.
//!
//! # Self-healing
//!
//! A corrupt persisted entry is never surfaced as an error: it is
//! deleted and reported as a miss so it cannot repeatedly fail. An
//! initialization sweep removes entries that outlived the TTL.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::entry::now_epoch;
use crate::error::Result;
use crate::model::TIMELINE_CACHE_PREFIX;
use crate::store::KeyValueStore;

/// Wire format of a persisted cache entry: payload plus a creation
/// timestamp wrapper
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    /// Creation timestamp (epoch seconds)
    created_at: u64,
    /// Serialized payload (JSON text)
    payload: String,
}

/// Persistent cache - durable warm tier
pub struct PersistentCache {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl PersistentCache {
    /// Open the tier over a store and sweep out entries that outlived
    /// the TTL while the process was down
    pub async fn open(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Result<Self> {
        let cache = Self { store, ttl };
        cache.sweep().await?;
        Ok(cache)
    }

    /// Get a payload together with its original creation timestamp.
    ///
    /// Expired and corrupt entries are removed and reported as misses.
    pub async fn get(&self, key: &str) -> Option<(Bytes, u64)> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "persistent cache read failed, treating as miss");
                return None;
            }
        };

        let entry: PersistedEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "corrupt persisted entry, removing");
                let _ = self.store.remove(key).await;
                return None;
            }
        };

        if now_epoch().saturating_sub(entry.created_at) > self.ttl.as_secs() {
            let _ = self.store.remove(key).await;
            return None;
        }

        Some((Bytes::from(entry.payload.into_bytes()), entry.created_at))
    }

    /// Write a payload stamped with the current time
    pub async fn put(&self, key: &str, payload: &Bytes) -> Result<()> {
        self.put_with_created_at(key, payload, now_epoch()).await
    }

    /// Write a payload with an explicit creation timestamp (tests)
    pub async fn put_with_created_at(
        &self,
        key: &str,
        payload: &Bytes,
        created_at: u64,
    ) -> Result<()> {
        let entry = PersistedEntry {
            created_at,
            payload: String::from_utf8_lossy(payload).into_owned(),
        };
        let raw = serde_json::to_string(&entry)?;
        self.store.set(key, &raw).await
    }

    /// Remove a single key
    pub async fn remove(&self, key: &str) -> Result<bool> {
        self.store.remove(key).await
    }

    /// Remove every cache entry whose key contains the given substring.
    ///
    /// Only keys inside the timeline cache namespace are touched; the
    /// quota manager's record namespaces share the same store.
    pub async fn invalidate(&self, pattern: &str) -> Result<usize> {
        let keys = self.store.keys().await?;
        let mut removed = 0;
        for key in keys {
            if key.starts_with(TIMELINE_CACHE_PREFIX) && key.contains(pattern) {
                if self.store.remove(&key).await? {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    /// Remove all cache entries in the namespace
    pub async fn clear(&self) -> Result<usize> {
        self.invalidate("").await
    }

    /// Remove expired and corrupt entries from the namespace
    pub async fn sweep(&self) -> Result<usize> {
        let keys = self.store.keys().await?;
        let mut removed = 0;
        let now = now_epoch();
        for key in keys {
            if !key.starts_with(TIMELINE_CACHE_PREFIX) {
                continue;
            }
            let Some(raw) = self.store.get(&key).await? else {
                continue;
            };
            let expired = match serde_json::from_str::<PersistedEntry>(&raw) {
                Ok(entry) => now.saturating_sub(entry.created_at) > self.ttl.as_secs(),
                Err(_) => true,
            };
            if expired && self.store.remove(&key).await? {
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(removed, "persistent cache sweep removed stale entries");
        }
        Ok(removed)
    }

    /// Configured TTL
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

// =============================================================================
// Tests
// =============================================================================
