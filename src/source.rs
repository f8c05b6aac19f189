//! Remote Query Source
//!
//! External collaborator answering paged timeline queries and aggregate
//! statistics. Latency and availability are not controlled here; the
//! caching layers above exist precisely because this source is slow and
//! occasionally unavailable. Pluggable backend trait with an in-memory
//! implementation for testing.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::model::{TimelineFilter, TimelineItem, TimelineResponse, TimelineStatistics};

/// Remote query source trait
#[async_trait]
pub trait RemoteQuerySource: Send + Sync {
    /// Fetch one page of the filtered timeline
    async fn fetch_page(
        &self,
        filter: &TimelineFilter,
        limit: usize,
        offset: usize,
    ) -> Result<TimelineResponse>;

    /// Fetch aggregate statistics for the filtered timeline
    async fn fetch_statistics(&self, filter: &TimelineFilter) -> Result<TimelineStatistics>;
}

/// In-memory remote source for testing
///
/// Holds a fixed item set, applies filters, and slices pages. Fetch
/// counters let tests assert which operations actually hit the
/// "network".
pub struct InMemoryRemoteSource {
    items: RwLock<Vec<TimelineItem>>,
    page_fetches: AtomicU64,
    stats_fetches: AtomicU64,
}

impl Default for InMemoryRemoteSource {
    fn default() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            page_fetches: AtomicU64::new(0),
            stats_fetches: AtomicU64::new(0),
        }
    }
}

impl InMemoryRemoteSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a source pre-loaded with items
    pub fn with_items(items: Vec<TimelineItem>) -> Self {
        let source = Self::new();
        source.replace_items(items);
        source
    }

    /// Replace the full item set (kept sorted descending by date)
    pub fn replace_items(&self, mut items: Vec<TimelineItem>) {
        items.sort_by(|a, b| b.date.cmp(&a.date));
        *self.items.write() = items;
    }

    /// Append one item
    pub fn push_item(&self, item: TimelineItem) {
        let mut items = self.items.write();
        items.push(item);
        items.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// Number of page fetches served
    pub fn page_fetches(&self) -> u64 {
        self.page_fetches.load(Ordering::Relaxed)
    }

    /// Number of statistics fetches served
    pub fn stats_fetches(&self) -> u64 {
        self.stats_fetches.load(Ordering::Relaxed)
    }

    fn matches(filter: &TimelineFilter, item: &TimelineItem) -> bool {
        if let Some(category) = &filter.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(animal_id) = &filter.animal_id {
            if item.animal_id.as_deref() != Some(animal_id.as_str()) {
                return false;
            }
        }
        if let Some(start) = filter.start_date {
            if item.date < start {
                return false;
            }
        }
        if let Some(end) = filter.end_date {
            if item.date > end {
                return false;
            }
        }
        if let Some(kinds) = &filter.kinds {
            if !kinds.contains(&item.kind) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl RemoteQuerySource for InMemoryRemoteSource {
    async fn fetch_page(
        &self,
        filter: &TimelineFilter,
        limit: usize,
        offset: usize,
    ) -> Result<TimelineResponse> {
        self.page_fetches.fetch_add(1, Ordering::Relaxed);

        let items = self.items.read();
        let matching: Vec<&TimelineItem> = items
            .iter()
            .filter(|item| Self::matches(filter, item))
            .collect();
        let total_count = matching.len();

        let page: Vec<TimelineItem> = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();

        Ok(TimelineResponse::new(page, total_count, offset))
    }

    async fn fetch_statistics(&self, filter: &TimelineFilter) -> Result<TimelineStatistics> {
        self.stats_fetches.fetch_add(1, Ordering::Relaxed);

        let items = self.items.read();
        let mut stats = TimelineStatistics::default();
        for item in items.iter().filter(|item| Self::matches(filter, item)) {
            stats.item_count += 1;
            stats.total_amount += item.amount.unwrap_or(0.0);
            *stats
                .counts_by_kind
                .entry(item.kind.as_str().to_string())
                .or_default() += 1;
            stats.earliest = Some(match stats.earliest {
                Some(e) if e <= item.date => e,
                _ => item.date,
            });
            stats.latest = Some(match stats.latest {
                Some(l) if l >= item.date => l,
                _ => item.date,
            });
        }
        Ok(stats)
    }
}

// =============================================================================
// Tests
// =============================================================================
