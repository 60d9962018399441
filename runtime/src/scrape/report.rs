//! Per-run tallies for operators.

use crate::extraction::strategy::RowTally;
use crate::rankings::{RejectionReason, YearWeekTarget};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A unit that could not be navigated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedUnit {
    pub target: YearWeekTarget,
    pub cause: String,
}

/// A year whose week list could not be reached at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedYear {
    pub year: String,
    pub cause: String,
}

/// Summary of one orchestrator run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Years offered by the page that fell inside the requested range.
    pub years: Vec<String>,
    /// Week labels per year, in presentation order.
    pub week_order: BTreeMap<String, Vec<String>>,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: Vec<FailedUnit>,
    pub failed_years: Vec<FailedYear>,
    /// Units that navigated fine but held no ranking rows.
    pub empty: Vec<YearWeekTarget>,
    /// Rows dropped by validation, by reason.
    pub rejected: BTreeMap<String, usize>,
    /// Rows skipped by the extraction heuristics.
    pub skipped_rows: RowTally,
    pub entries: usize,
    /// Set when the page itself could not be loaded.
    pub load_error: Option<String>,
    pub cancelled: bool,
}

impl RunReport {
    pub fn record_failure(&mut self, target: YearWeekTarget, cause: impl Into<String>) {
        self.failed.push(FailedUnit {
            target,
            cause: cause.into(),
        });
    }

    pub fn record_rejection(&mut self, reason: RejectionReason) {
        *self.rejected.entry(format!("{reason:?}")).or_insert(0) += 1;
    }

    pub fn add_skipped(&mut self, tally: &RowTally) {
        self.skipped_rows.too_short += tally.too_short;
        self.skipped_rows.header += tally.header;
        self.skipped_rows.invalid_rank += tally.invalid_rank;
        self.skipped_rows.no_team += tally.no_team;
    }

    /// `(year, week)` of every failed unit, in attempt order.
    pub fn failed_pairs(&self) -> Vec<(String, String)> {
        self.failed
            .iter()
            .map(|f| (f.target.year.clone(), f.target.week.clone()))
            .collect()
    }

    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Position of `week` in the year's presentation order.
    pub fn week_position(&self, year: i32, week: &str) -> Option<usize> {
        self.week_order
            .get(&year.to_string())
            .and_then(|weeks| weeks.iter().position(|w| w == week))
    }

    /// Every attempted unit either succeeded or was recorded as failed.
    pub fn is_consistent(&self) -> bool {
        self.attempted == self.succeeded + self.failed.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tallies() {
        let mut report = RunReport::default();
        report.attempted = 3;
        report.succeeded = 2;
        report.record_failure(YearWeekTarget::new("2021", "Week 5"), "option missing");
        report.record_rejection(RejectionReason::DuplicateRank);
        report.record_rejection(RejectionReason::DuplicateRank);
        report.record_rejection(RejectionReason::EmptyTeam);
        report
            .week_order
            .insert("2021".to_string(), vec!["Week 5".into(), "Final".into()]);

        assert!(report.is_consistent());
        assert_eq!(
            report.failed_pairs(),
            vec![("2021".to_string(), "Week 5".to_string())]
        );
        assert_eq!(report.rejected_total(), 3);
        assert_eq!(report.rejected["DuplicateRank"], 2);
        assert_eq!(report.week_position(2021, "Final"), Some(1));
        assert_eq!(report.week_position(2021, "Week 9"), None);
        assert_eq!(report.week_position(2020, "Final"), None);
    }
}
