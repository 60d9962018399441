//! Ranking extraction from rendered markup.
//!
//! Pure and deterministic: a markup snapshot goes in, candidates come out in
//! document order. Strategies are chained so a fallback for non-tabular
//! layouts can be appended without touching callers.

pub mod heuristics;
pub mod strategy;
pub mod table;

pub use heuristics::{Cell, FieldDetector, RowHeuristics, RowOutcome};
pub use strategy::{ExtractionOutcome, ExtractionStrategy, StrategyChain, UnitScan};
pub use table::TableScan;

use crate::rankings::RawCandidate;

/// Extract ranking candidates from `markup` with the default chain.
pub fn extract(markup: &str) -> Vec<RawCandidate> {
    StrategyChain::default().run(markup).candidates()
}
