//! Pluggable extraction strategies.

use crate::rankings::RawCandidate;
use scraper::Html;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Row counts by outcome for one structural unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowTally {
    pub too_short: usize,
    pub header: usize,
    pub invalid_rank: usize,
    pub no_team: usize,
}

/// Result of scanning one structural element (a table, a container).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitScan {
    /// Human-readable locator, e.g. `table[0].rankings`.
    pub label: String,
    pub rows: usize,
    pub candidates: Vec<RawCandidate>,
    pub skipped: RowTally,
}

impl UnitScan {
    /// The unit was scanned fine but held no ranking rows.
    pub fn is_zero_rows(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// A way of finding ranking rows in a parsed document.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Scan every unit this strategy recognises, in document order.
    fn scan(&self, document: &Html) -> Vec<UnitScan>;
}

/// What a chain run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionOutcome {
    /// Strategy that produced candidates; `None` when every strategy came up empty.
    pub strategy: Option<&'static str>,
    /// Units scanned by every strategy that ran.
    pub units: Vec<UnitScan>,
}

impl ExtractionOutcome {
    /// All candidates in document order.
    pub fn candidates(&self) -> Vec<RawCandidate> {
        self.units
            .iter()
            .flat_map(|u| u.candidates.iter().cloned())
            .collect()
    }

    pub fn candidate_count(&self) -> usize {
        self.units.iter().map(|u| u.candidates.len()).sum()
    }

    /// No strategy found a single row. Not an error: preseason and bye
    /// weeks legitimately render no table.
    pub fn is_empty(&self) -> bool {
        self.strategy.is_none()
    }
}

/// Strategies tried in order until one yields candidates.
pub struct StrategyChain {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::new(vec![Box::new(super::table::TableScan::default())])
    }
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Append a fallback strategy.
    pub fn then(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.strategies.push(strategy);
        self
    }

    /// Parse `markup` and run the chain.
    pub fn run(&self, markup: &str) -> ExtractionOutcome {
        let document = Html::parse_document(markup);
        self.run_document(&document)
    }

    /// Run the chain on an already-parsed document.
    pub fn run_document(&self, document: &Html) -> ExtractionOutcome {
        let mut outcome = ExtractionOutcome::default();
        for strategy in &self.strategies {
            let units = strategy.scan(document);
            for unit in units.iter().filter(|u| u.is_zero_rows()) {
                debug!(
                    strategy = strategy.name(),
                    unit = %unit.label,
                    rows = unit.rows,
                    "zero rows for this unit"
                );
            }
            let found = units.iter().any(|u| !u.is_zero_rows());
            outcome.units.extend(units);
            if found {
                outcome.strategy = Some(strategy.name());
                break;
            }
        }
        outcome
    }
}
