//! Per-Query Pagination State
//!
//! One `PaginationState` exists per distinct query signature: the
//! accumulated item list (append-only, deduplicated by identifier), the
//! load phase, the exhaustion flag, and cache-hit/request counters.

use std::collections::HashSet;

use crate::cache::now_epoch;
use crate::model::{TimelineFilter, TimelineItem};

/// Load phase of one paginated query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Initialized, nothing fetched yet
    Uninitialized,
    /// Initial page fetch in flight
    LoadingInitial,
    /// At rest with data, more pages may remain
    Ready,
    /// Follow-up page fetch in flight
    LoadingNext,
    /// Remote reported no more data; terminal for `load_next_page`
    Exhausted,
}

impl LoadPhase {
    /// Whether a fetch is currently in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::LoadingInitial | LoadPhase::LoadingNext)
    }
}

/// Mutable state for one query signature
pub(crate) struct PaginationState {
    /// The filter that defines this view
    pub filter: TimelineFilter,
    /// Accumulated items across pages, deduplicated by id
    pub items: Vec<TimelineItem>,
    /// Identifiers already present in `items`
    seen_ids: HashSet<String>,
    /// Current load phase
    pub phase: LoadPhase,
    /// Pages consumed so far
    pub current_page: usize,
    /// Last-known total count from the remote
    pub total_count: usize,
    /// Last successful update (epoch seconds)
    pub last_updated: u64,
    /// Most recent load failure, kept alongside intact items
    pub last_error: Option<String>,
    /// Page requests issued for this view
    pub requests: u64,
    /// Page requests served from cache
    pub cache_hits: u64,
}

impl PaginationState {
    pub fn new(filter: TimelineFilter) -> Self {
        Self {
            filter,
            items: Vec::new(),
            seen_ids: HashSet::new(),
            phase: LoadPhase::Uninitialized,
            current_page: 0,
            total_count: 0,
            last_updated: 0,
            last_error: None,
            requests: 0,
            cache_hits: 0,
        }
    }

    /// Replace the accumulated list (initial load / refresh)
    pub fn replace_items(&mut self, items: Vec<TimelineItem>) {
        self.seen_ids = items.iter().map(|i| i.id.clone()).collect();
        self.items = items;
    }

    /// Append incoming items, dropping identifiers already present.
    ///
    /// Order of arrival wins: later duplicates are dropped, not merged.
    /// Returns the number of new unique items appended.
    pub fn append_deduplicated(&mut self, incoming: Vec<TimelineItem>) -> usize {
        let mut appended = 0;
        for item in incoming {
            if self.seen_ids.insert(item.id.clone()) {
                self.items.push(item);
                appended += 1;
            }
        }
        appended
    }

    /// Record a successful update timestamp
    pub fn touch(&mut self) {
        self.last_updated = now_epoch();
    }

    /// Snapshot for callers
    pub fn snapshot(&self) -> PaginationSnapshot {
        PaginationSnapshot {
            phase: self.phase,
            item_count: self.items.len(),
            current_page: self.current_page,
            total_count: self.total_count,
            last_updated: self.last_updated,
            last_error: self.last_error.clone(),
            requests: self.requests,
            cache_hits: self.cache_hits,
        }
    }
}

/// Point-in-time view of one query's pagination state
#[derive(Debug, Clone)]
pub struct PaginationSnapshot {
    /// Current load phase
    pub phase: LoadPhase,
    /// Accumulated item count
    pub item_count: usize,
    /// Pages consumed
    pub current_page: usize,
    /// Last-known total count
    pub total_count: usize,
    /// Last successful update (epoch seconds)
    pub last_updated: u64,
    /// Most recent load failure
    pub last_error: Option<String>,
    /// Page requests issued
    pub requests: u64,
    /// Page requests served from cache
    pub cache_hits: u64,
}

// =============================================================================
// Tests
// =============================================================================
