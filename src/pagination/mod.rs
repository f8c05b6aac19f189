//! Infinite-Scroll Pagination over the Tiered Cache
//!
//! Presents an append-only, deduplicated item list per query signature
//! with speculative prefetching of upcoming pages.
//!
//! # State machine (per query signature)
//!
//! ```text
//! Uninitialized -> Loading(initial) -> Ready -> Loading(next) -> Ready
//!                                        ...                 -> Exhausted
//! ```
//!
//! `Exhausted` is terminal for `load_next_page`; `refresh` returns any
//! state to initial loading after invalidating the signature's cache
//! family.

mod controller;
mod prefetch;
mod state;

pub use controller::{PaginatorConfig, TimelinePaginator};
pub use prefetch::PrefetchScheduler;
pub use state::{LoadPhase, PaginationSnapshot};

use std::time::Duration;

/// Default page size for timeline fetches
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// `should_load_more` fires within this many items of the list end
pub const LOAD_MORE_THRESHOLD: usize = 5;

/// Debounce before a scheduled prefetch runs; re-arming cancels the
/// pending one so rapid scrolling coalesces into a single prefetch
pub const PREFETCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// Above this total count, prefetch looks two pages ahead instead of one
pub const PREFETCH_WIDE_THRESHOLD: usize = 100;
