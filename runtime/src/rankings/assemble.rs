//! Turn extraction candidates into validated, timestamped entries.

use super::model::{RankingEntry, RawCandidate, MAX_RANK, MIN_RANK};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Why a candidate was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectionReason {
    RankOutOfRange,
    EmptyTeam,
    NumericTeam,
    /// A lower row claimed a rank an earlier row already holds.
    DuplicateRank,
}

/// A structurally parsed row that failed an invariant. Counted, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRejection {
    pub rank: u32,
    pub team: String,
    pub reason: RejectionReason,
}

/// Output of one assembly call.
#[derive(Debug, Clone, Default)]
pub struct AssembledBatch {
    pub entries: Vec<RankingEntry>,
    pub rejections: Vec<ValidationRejection>,
}

/// Validate `candidates` for one unit, stamped with the current time.
pub fn assemble(candidates: Vec<RawCandidate>, year: i32, week: &str) -> AssembledBatch {
    assemble_at(candidates, year, week, Utc::now())
}

/// Validate `candidates` for one unit with an explicit timestamp.
///
/// Ranks are unique within the batch: the first row holding a rank wins.
pub fn assemble_at(
    candidates: Vec<RawCandidate>,
    year: i32,
    week: &str,
    scraped_at: DateTime<Utc>,
) -> AssembledBatch {
    let mut batch = AssembledBatch::default();
    let mut seen = HashSet::new();

    for candidate in candidates {
        let team = candidate.team.trim().to_string();
        let reason = if !(MIN_RANK..=MAX_RANK).contains(&candidate.rank) {
            Some(RejectionReason::RankOutOfRange)
        } else if team.is_empty() {
            Some(RejectionReason::EmptyTeam)
        } else if team.chars().all(|c| c.is_ascii_digit()) {
            Some(RejectionReason::NumericTeam)
        } else if !seen.insert(candidate.rank) {
            Some(RejectionReason::DuplicateRank)
        } else {
            None
        };

        match reason {
            Some(reason) => {
                debug!(year, week, rank = candidate.rank, team = %team, ?reason, "row rejected");
                batch.rejections.push(ValidationRejection {
                    rank: candidate.rank,
                    team,
                    reason,
                });
            }
            None => batch.entries.push(RankingEntry {
                year,
                week: week.to_string(),
                rank: candidate.rank,
                team,
                record: candidate.record,
                scraped_at,
            }),
        }
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(rank: u32, team: &str, record: &str) -> RawCandidate {
        RawCandidate {
            rank,
            team: team.to_string(),
            record: record.to_string(),
        }
    }

    #[test]
    fn test_assemble_stamps_year_week_and_time() {
        let now = Utc::now();
        let batch = assemble_at(
            vec![candidate(1, "Georgia Bulldogs", "12-1")],
            2023,
            "Week 12",
            now,
        );
        assert!(batch.rejections.is_empty());
        assert_eq!(
            batch.entries,
            vec![RankingEntry {
                year: 2023,
                week: "Week 12".to_string(),
                rank: 1,
                team: "Georgia Bulldogs".to_string(),
                record: "12-1".to_string(),
                scraped_at: now,
            }]
        );
    }

    #[test]
    fn test_duplicate_rank_keeps_first() {
        let batch = assemble(
            vec![
                candidate(1, "Georgia Bulldogs", "12-1"),
                candidate(2, "Michigan Wolverines", "12-0"),
                candidate(1, "Duplicate Table Copy", "12-1"),
            ],
            2023,
            "Final",
        );
        assert_eq!(batch.entries.len(), 2);
        assert_eq!(batch.entries[0].team, "Georgia Bulldogs");
        assert_eq!(batch.rejections.len(), 1);
        assert_eq!(batch.rejections[0].reason, RejectionReason::DuplicateRank);
        assert_eq!(batch.rejections[0].team, "Duplicate Table Copy");
    }

    #[test]
    fn test_invariants_rechecked() {
        let batch = assemble(
            vec![
                candidate(0, "Zero Rank", ""),
                candidate(26, "Too Low", ""),
                candidate(3, "   ", ""),
                candidate(4, "1234", ""),
                candidate(5, "Texas Longhorns", ""),
            ],
            2024,
            "Week 10",
        );
        let reasons: Vec<_> = batch.rejections.iter().map(|r| r.reason).collect();
        assert_eq!(
            reasons,
            vec![
                RejectionReason::RankOutOfRange,
                RejectionReason::RankOutOfRange,
                RejectionReason::EmptyTeam,
                RejectionReason::NumericTeam,
            ]
        );
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].rank, 5);
        assert_eq!(batch.entries[0].record, "");
    }

    #[test]
    fn test_rejected_rows_do_not_claim_ranks() {
        let batch = assemble(
            vec![candidate(7, "", ""), candidate(7, "Oregon Ducks", "11-1")],
            2024,
            "Week 11",
        );
        assert_eq!(batch.entries.len(), 1);
        assert_eq!(batch.entries[0].team, "Oregon Ducks");
    }
}
