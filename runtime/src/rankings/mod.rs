//! Ranking records and their validation.

pub mod assemble;
pub mod model;

pub use assemble::{assemble, assemble_at, AssembledBatch, RejectionReason, ValidationRejection};
pub use model::{RankingEntry, RawCandidate, YearWeekTarget, MAX_RANK, MIN_RANK};
