//! Timeline Item Types
//!
//! A timeline is a heterogeneous, date-ordered feed of journal entries,
//! expenses, and other record categories. Items are immutable value
//! objects constructed from remote rows on fetch and discarded on
//! eviction or refresh.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a timeline record.
///
/// `Other` keeps the enum open for categories added on the backend
/// before the client learns about them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TimelineKind {
    /// Journal entry
    Journal,
    /// Expense record
    Expense,
    /// A category this client version does not know
    Other(String),
}

impl TimelineKind {
    /// Get the wire name for this kind
    pub fn as_str(&self) -> &str {
        match self {
            TimelineKind::Journal => "journal",
            TimelineKind::Expense => "expense",
            TimelineKind::Other(name) => name,
        }
    }

    /// All kinds known to this client (the default filter set)
    pub fn all_known() -> Vec<Self> {
        vec![TimelineKind::Journal, TimelineKind::Expense]
    }
}

impl From<String> for TimelineKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "journal" => TimelineKind::Journal,
            "expense" => TimelineKind::Expense,
            _ => TimelineKind::Other(s),
        }
    }
}

impl From<TimelineKind> for String {
    fn from(kind: TimelineKind) -> Self {
        kind.as_str().to_string()
    }
}

impl std::fmt::Display for TimelineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single normalized timeline record.
///
/// `id` is unique within one user's timeline and drives deduplication;
/// `date` drives the descending feed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineItem {
    /// Unique identifier within the user's timeline
    pub id: String,
    /// Record timestamp (feed is ordered descending by this)
    pub date: DateTime<Utc>,
    /// Record kind
    pub kind: TimelineKind,
    /// Short title
    pub title: String,
    /// Description / journal content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Monetary amount (expenses)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Associated animal reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    /// Free-form tags
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Free-form metadata carried through from the remote row
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, serde_json::Value>>,
}

impl TimelineItem {
    /// Minimal constructor for the required fields; optionals start empty
    pub fn new(
        id: impl Into<String>,
        date: DateTime<Utc>,
        kind: TimelineKind,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date,
            kind,
            title: title.into(),
            description: None,
            amount: None,
            category: None,
            animal_id: None,
            tags: None,
            metadata: None,
        }
    }
}

/// One page of timeline results - the unit of caching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineResponse {
    /// Items in this page, ordered descending by date
    pub items: Vec<TimelineItem>,
    /// Total matching items across all pages
    pub total_count: usize,
    /// Whether more pages remain after this one
    pub has_more: bool,
    /// Offset of the next page, when one exists
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
}

impl TimelineResponse {
    /// Build a response, deriving `has_more` and `next_offset` from the
    /// page coordinates so the invariant
    /// `has_more == offset + items.len() < total_count` holds by
    /// construction.
    pub fn new(items: Vec<TimelineItem>, total_count: usize, offset: usize) -> Self {
        let consumed = offset + items.len();
        let has_more = consumed < total_count;
        Self {
            items,
            total_count,
            has_more,
            next_offset: has_more.then_some(consumed),
        }
    }

    /// An empty, exhausted response
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
            has_more: false,
            next_offset: None,
        }
    }
}

/// Aggregate metrics over a filtered timeline, cached under its own
/// key family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineStatistics {
    /// Total matching items
    pub item_count: usize,
    /// Sum of all monetary amounts
    pub total_amount: f64,
    /// Item counts per kind (wire name -> count)
    pub counts_by_kind: BTreeMap<String, usize>,
    /// Oldest matching record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest: Option<DateTime<Utc>>,
    /// Newest matching record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<DateTime<Utc>>,
}

// =============================================================================
// Tests
// =============================================================================
