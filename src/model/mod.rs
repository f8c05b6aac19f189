//! Timeline Domain Model
//!
//! Structured value types for timeline records, paged responses, and
//! query signatures. Remote rows are converted into these types at the
//! serialization boundary; everything above it is strongly typed.

mod filter;
mod item;

pub use filter::{TimelineFilter, TIMELINE_CACHE_PREFIX};
pub use item::{TimelineItem, TimelineKind, TimelineResponse, TimelineStatistics};
