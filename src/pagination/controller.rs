//! Timeline Paginator
//!
//! The surface the presentation layer talks to: initialize a filtered
//! view, load pages through the tiered cache, poll `should_load_more`
//! while scrolling, refresh after mutations, dispose when the view
//! closes.
//!
//! # Concurrency
//!
//! Page loads for one signature are serialized by the loading-flag
//! guard: a second call arriving while one is in flight returns the
//! current items unchanged rather than queueing. Prefetch runs detached
//! and only warms the cache; it never mutates the visible list, and the
//! cache's last-write-wins puts make racing writes to the same page
//! harmless.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use super::prefetch::PrefetchScheduler;
use super::state::{LoadPhase, PaginationSnapshot, PaginationState};
use super::{DEFAULT_PAGE_SIZE, LOAD_MORE_THRESHOLD, PREFETCH_DEBOUNCE, PREFETCH_WIDE_THRESHOLD};
use crate::cache::TieredCache;
use crate::error::{Error, Result};
use crate::model::{TimelineFilter, TimelineItem, TimelineResponse, TimelineStatistics};
use crate::source::RemoteQuerySource;

/// Paginator configuration
#[derive(Debug, Clone)]
pub struct PaginatorConfig {
    /// Items per page
    pub page_size: usize,
    /// `should_load_more` distance from the list end
    pub load_more_threshold: usize,
    /// Debounce before a scheduled prefetch runs
    pub prefetch_debounce: Duration,
    /// Whether to warm the cache ahead of scroll demand
    pub enable_prefetch: bool,
}

impl Default for PaginatorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            load_more_threshold: LOAD_MORE_THRESHOLD,
            prefetch_debounce: PREFETCH_DEBOUNCE,
            enable_prefetch: true,
        }
    }
}

/// Infinite-scroll pagination over a paged remote source.
///
/// Explicitly constructed and owned (no process-wide state) so tests
/// can create isolated instances.
pub struct TimelinePaginator {
    source: Arc<dyn RemoteQuerySource>,
    cache: Arc<TieredCache>,
    states: DashMap<String, Arc<RwLock<PaginationState>>>,
    prefetch: PrefetchScheduler,
    config: PaginatorConfig,
}

impl TimelinePaginator {
    /// Create a paginator with default configuration
    pub fn new(source: Arc<dyn RemoteQuerySource>, cache: Arc<TieredCache>) -> Self {
        Self::with_config(PaginatorConfig::default(), source, cache)
    }

    /// Create a paginator with custom configuration
    pub fn with_config(
        config: PaginatorConfig,
        source: Arc<dyn RemoteQuerySource>,
        cache: Arc<TieredCache>,
    ) -> Self {
        Self {
            source,
            cache,
            states: DashMap::new(),
            prefetch: PrefetchScheduler::new(),
            config,
        }
    }

    /// Allocate pagination state for a filter; does not fetch.
    /// Returns the query signature used for all further calls.
    pub fn initialize(&self, filter: TimelineFilter) -> String {
        let signature = filter.signature();
        self.states
            .entry(signature.clone())
            .or_insert_with(|| Arc::new(RwLock::new(PaginationState::new(filter))));
        signature
    }

    fn state(&self, signature: &str) -> Result<Arc<RwLock<PaginationState>>> {
        self.states
            .get(signature)
            .map(|e| e.value().clone())
            .ok_or_else(|| Error::UnknownQuery(signature.to_string()))
    }

    /// Fetch page zero and replace the accumulated list.
    ///
    /// Schedules a prefetch when more data remains and the page came
    /// back full.
    pub async fn load_initial_page(&self, signature: &str) -> Result<Vec<TimelineItem>> {
        let state = self.state(signature)?;

        let filter = {
            let mut s = state.write();
            if s.phase.is_loading() {
                return Ok(s.items.clone());
            }
            s.phase = LoadPhase::LoadingInitial;
            s.filter.clone()
        };

        let fetched = self.fetch_page_cached(&state, &filter, 0).await;

        let mut s = state.write();
        match fetched {
            Ok(response) => {
                s.replace_items(response.items);
                s.total_count = response.total_count;
                s.current_page = 1;
                s.phase = if response.has_more {
                    LoadPhase::Ready
                } else {
                    LoadPhase::Exhausted
                };
                s.last_error = None;
                s.touch();

                let items = s.items.clone();
                let warrants_prefetch = response.has_more && items.len() >= self.config.page_size;
                let next_offset = items.len();
                let total = s.total_count;
                drop(s);

                if warrants_prefetch {
                    self.schedule_prefetch(signature, &filter, next_offset, total);
                }
                Ok(items)
            }
            Err(e) => {
                // A failed load never erases already-shown data
                s.phase = if s.items.is_empty() {
                    LoadPhase::Uninitialized
                } else {
                    LoadPhase::Ready
                };
                s.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch the next page and append deduplicated items.
    ///
    /// No-op returning the current items when a load is already in
    /// flight or the view is exhausted; callers re-poll rather than
    /// queue.
    pub async fn load_next_page(&self, signature: &str) -> Result<Vec<TimelineItem>> {
        let state = self.state(signature)?;

        let (filter, offset) = {
            let mut s = state.write();
            if s.phase.is_loading() || s.phase == LoadPhase::Exhausted {
                return Ok(s.items.clone());
            }
            s.phase = LoadPhase::LoadingNext;
            (s.filter.clone(), s.items.len())
        };

        let fetched = self.fetch_page_cached(&state, &filter, offset).await;

        let mut s = state.write();
        match fetched {
            Ok(response) => {
                let appended = s.append_deduplicated(response.items);
                s.total_count = response.total_count;
                s.current_page += 1;
                s.phase = if response.has_more {
                    LoadPhase::Ready
                } else {
                    LoadPhase::Exhausted
                };
                s.last_error = None;
                s.touch();

                let items = s.items.clone();
                let next_offset = items.len();
                let total = s.total_count;
                drop(s);

                if appended > 0 && response.has_more {
                    self.schedule_prefetch(signature, &filter, next_offset, total);
                }
                Ok(items)
            }
            Err(e) => {
                s.phase = LoadPhase::Ready;
                s.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Invalidate the signature's cache family, reset scroll state, and
    /// reload from page zero
    pub async fn refresh(&self, signature: &str) -> Result<Vec<TimelineItem>> {
        let state = self.state(signature)?;

        let filter = {
            let mut s = state.write();
            if s.phase.is_loading() {
                return Ok(s.items.clone());
            }
            s.phase = LoadPhase::Uninitialized;
            s.current_page = 0;
            s.filter.clone()
        };

        self.prefetch.cancel(signature);
        self.cache.invalidate(&filter.signature()).await;
        self.load_initial_page(signature).await
    }

    /// Whether a scrolling UI at `visible_index` should trigger
    /// `load_next_page`
    pub fn should_load_more(&self, signature: &str, visible_index: usize) -> bool {
        let Ok(state) = self.state(signature) else {
            return false;
        };
        let s = state.read();
        if s.phase.is_loading() || s.phase == LoadPhase::Exhausted || s.items.is_empty() {
            return false;
        }
        visible_index + self.config.load_more_threshold >= s.items.len()
    }

    /// Current accumulated items for a signature
    pub fn items(&self, signature: &str) -> Result<Vec<TimelineItem>> {
        Ok(self.state(signature)?.read().items.clone())
    }

    /// Whether more pages remain
    pub fn has_more_data(&self, signature: &str) -> bool {
        self.state(signature)
            .map(|s| s.read().phase != LoadPhase::Exhausted)
            .unwrap_or(false)
    }

    /// Whether a load is in flight
    pub fn is_loading(&self, signature: &str) -> bool {
        self.state(signature)
            .map(|s| s.read().phase.is_loading())
            .unwrap_or(false)
    }

    /// Point-in-time state snapshot (phase, counts, error, metrics)
    pub fn snapshot(&self, signature: &str) -> Result<PaginationSnapshot> {
        Ok(self.state(signature)?.read().snapshot())
    }

    /// Aggregate statistics for a filter, served through the same
    /// tiered cache under the signature's statistics key
    pub async fn get_statistics(&self, filter: &TimelineFilter) -> Result<TimelineStatistics> {
        let key = filter.stats_key();

        if let Some((payload, _)) = self.cache.get(&key).await {
            match serde_json::from_slice::<TimelineStatistics>(&payload) {
                Ok(stats) => return Ok(stats),
                Err(e) => debug!(key, error = %e, "cached statistics unreadable, refetching"),
            }
        }

        let stats = self.source.fetch_statistics(filter).await?;
        let payload = Bytes::from(serde_json::to_vec(&stats)?);
        self.cache.put(&key, payload).await;
        Ok(stats)
    }

    /// Cancel pending prefetch and discard state for a signature
    pub fn dispose(&self, signature: &str) {
        self.prefetch.cancel(signature);
        self.states.remove(signature);
    }

    /// Discard all pagination state
    pub fn dispose_all(&self) {
        self.prefetch.cancel_all();
        self.states.clear();
    }

    /// Initialize several views and load their first pages concurrently
    /// (fan-out, wait-all). Each view succeeds or fails independently.
    pub async fn initialize_and_load_all(
        &self,
        filters: Vec<TimelineFilter>,
    ) -> Vec<(String, Result<Vec<TimelineItem>>)> {
        let signatures: Vec<String> = filters
            .into_iter()
            .map(|filter| self.initialize(filter))
            .collect();

        let loads = signatures
            .iter()
            .map(|signature| self.load_initial_page(signature));
        let results = futures::future::join_all(loads).await;

        signatures.into_iter().zip(results).collect()
    }

    /// Fetch one page through the cache, falling back to the remote
    /// source and writing through on a miss
    async fn fetch_page_cached(
        &self,
        state: &Arc<RwLock<PaginationState>>,
        filter: &TimelineFilter,
        offset: usize,
    ) -> Result<TimelineResponse> {
        let key = filter.page_key(offset, self.config.page_size);
        state.write().requests += 1;

        if let Some((payload, tier)) = self.cache.get(&key).await {
            match serde_json::from_slice::<TimelineResponse>(&payload) {
                Ok(response) => {
                    debug!(key, %tier, "page served from cache");
                    state.write().cache_hits += 1;
                    return Ok(response);
                }
                Err(e) => debug!(key, error = %e, "cached page unreadable, refetching"),
            }
        }

        let response = self
            .source
            .fetch_page(filter, self.config.page_size, offset)
            .await?;
        let payload = Bytes::from(serde_json::to_vec(&response)?);
        self.cache.put(&key, payload).await;
        Ok(response)
    }

    /// Arm the debounced cache warm-up for the pages after `next_offset`
    fn schedule_prefetch(
        &self,
        signature: &str,
        filter: &TimelineFilter,
        next_offset: usize,
        total_count: usize,
    ) {
        if !self.config.enable_prefetch {
            return;
        }

        let pages_ahead = if total_count > PREFETCH_WIDE_THRESHOLD { 2 } else { 1 };
        let cache = self.cache.clone();
        let source = self.source.clone();
        let filter = filter.clone();
        let page_size = self.config.page_size;

        self.prefetch
            .schedule(signature, self.config.prefetch_debounce, async move {
                for page in 0..pages_ahead {
                    let offset = next_offset + page * page_size;
                    if offset >= total_count {
                        break;
                    }
                    let key = filter.page_key(offset, page_size);
                    if cache.get(&key).await.is_some() {
                        continue;
                    }
                    match source.fetch_page(&filter, page_size, offset).await {
                        Ok(response) => match serde_json::to_vec(&response) {
                            Ok(bytes) => cache.put(&key, Bytes::from(bytes)).await,
                            Err(e) => debug!(offset, error = %e, "prefetch encode failed"),
                        },
                        // Speculative fetch: never surfaces to the UI
                        Err(e) => debug!(offset, error = %e, "prefetch fetch failed"),
                    }
                }
            });
    }
}

// =============================================================================
// Tests
// =============================================================================
