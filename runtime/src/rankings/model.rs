//! Core record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest rank a poll can assign.
pub const MIN_RANK: u32 = 1;
/// Highest rank a poll can assign.
pub const MAX_RANK: u32 = 25;

/// One ranked team for one week. Built only by [`crate::rankings::assemble`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankingEntry {
    /// Four-digit season.
    pub year: i32,
    /// Week label exactly as the week dropdown shows it.
    pub week: String,
    /// 1..=25.
    pub rank: u32,
    pub team: String,
    /// Wins-losses like `12-1`, or empty when the page omits it.
    pub record: String,
    pub scraped_at: DateTime<Utc>,
}

/// A row that looked like a ranking before any invariant was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub rank: u32,
    pub team: String,
    pub record: String,
}

/// A navigation unit: one `(year, week)` pair as the dropdowns present it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct YearWeekTarget {
    pub year: String,
    pub week: String,
}

impl YearWeekTarget {
    pub fn new(year: impl Into<String>, week: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            week: week.into(),
        }
    }
}

impl fmt::Display for YearWeekTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.year, self.week)
    }
}
