//! Query Signatures and Cache Key Construction
//!
//! A filter combination (category, animal, date range, item kinds)
//! identifies one distinct paginated timeline view. Its deterministic
//! string signature doubles as the pagination-state key and, combined
//! with page coordinates, as the cache key, so every page of every
//! filter combination gets its own cache slot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::TimelineKind;

/// Key namespace for all timeline cache entries in the durable store.
///
/// Quota-manager bookkeeping lives under disjoint prefixes; neither
/// component owns the store exclusively.
pub const TIMELINE_CACHE_PREFIX: &str = "timeline_cache_";

/// The filter tuple identifying one distinct timeline view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineFilter {
    /// Restrict to one category label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Restrict to one animal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    /// Inclusive lower date bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper date bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Restrict to these kinds; `None` means all known kinds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kinds: Option<Vec<TimelineKind>>,
}

impl TimelineFilter {
    /// Filter matching everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Filter restricted to one category
    pub fn for_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Filter restricted to one animal
    pub fn for_animal(animal_id: impl Into<String>) -> Self {
        Self {
            animal_id: Some(animal_id.into()),
            ..Self::default()
        }
    }

    /// Effective kind list (defaults to all known kinds)
    pub fn effective_kinds(&self) -> Vec<TimelineKind> {
        self.kinds.clone().unwrap_or_else(TimelineKind::all_known)
    }

    /// Deterministic signature string for this filter combination.
    ///
    /// Absent fields render as `*` so distinct combinations can never
    /// collide by field omission.
    pub fn signature(&self) -> String {
        let kinds = match &self.kinds {
            Some(kinds) => kinds
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(","),
            None => "*".to_string(),
        };
        format!(
            "cat={}|animal={}|from={}|to={}|kinds={}",
            self.category.as_deref().unwrap_or("*"),
            self.animal_id.as_deref().unwrap_or("*"),
            self.start_date.map_or("*".to_string(), |d| d.timestamp().to_string()),
            self.end_date.map_or("*".to_string(), |d| d.timestamp().to_string()),
            kinds,
        )
    }

    /// Cache key for one page of this view
    pub fn page_key(&self, offset: usize, limit: usize) -> String {
        format!(
            "{}page|{}|off={}|lim={}",
            TIMELINE_CACHE_PREFIX,
            self.signature(),
            offset,
            limit
        )
    }

    /// Cache key for the aggregate statistics of this view
    pub fn stats_key(&self) -> String {
        format!("{}stats|{}", TIMELINE_CACHE_PREFIX, self.signature())
    }
}

// =============================================================================
// Tests
// =============================================================================
