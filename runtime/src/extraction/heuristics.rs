//! Per-row field detection.
//!
//! Ranking tables on the site have no stable schema: logos, team names,
//! records and points shift between columns from season to season. Each
//! field is found by an independent detector; [`RowHeuristics`] runs them
//! in order and the first detector to fill a field wins, so a sharper
//! detector can be placed ahead of the positional ones.

use crate::rankings::{RawCandidate, MAX_RANK, MIN_RANK};
use regex::Regex;
use std::sync::LazyLock;

/// First-cell texts that mark a header row.
pub const HEADER_SYNONYMS: &[&str] = &["rank", "#", "ranking", "rnk"];

/// Rows with fewer cells than this are layout noise.
pub const MIN_CELLS: usize = 3;

/// Team names sit within this many cells of the row start (exclusive bound).
const TEAM_SCAN_END: usize = 4;

/// Records sit within this many cells of the row start (exclusive bound).
const RECORD_SCAN_END: usize = 6;

const MAX_RECORD_LEN: usize = 8;

static LOGO_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)logo").unwrap());

/// One table cell as seen by the detectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    /// Whitespace-normalised visible text.
    pub text: String,
    /// Value of the `class` attribute, if any.
    pub class: Option<String>,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            class: None,
        }
    }
}

/// What the first cell says about the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankCell {
    Header,
    Rank(u32),
    /// Unparseable or outside `MIN_RANK..=MAX_RANK`.
    Invalid,
}

/// Classify the rank cell text.
pub fn detect_rank(text: &str) -> RankCell {
    let raw = text.trim().to_lowercase();
    let stripped: String = raw.chars().filter(|c| *c != '#' && *c != '.').collect();
    let stripped = stripped.trim();

    if HEADER_SYNONYMS.contains(&raw.as_str()) || HEADER_SYNONYMS.contains(&stripped) {
        return RankCell::Header;
    }

    match stripped.parse::<i64>() {
        Ok(n) if (MIN_RANK as i64..=MAX_RANK as i64).contains(&n) => RankCell::Rank(n as u32),
        _ => RankCell::Invalid,
    }
}

/// Remove logo noise from a cell's text.
pub fn clean_team_text(text: &str) -> String {
    LOGO_RE.replace_all(text, "").trim().to_string()
}

/// First plausible team name among the cells following the rank.
pub fn detect_team(cells: &[Cell]) -> Option<String> {
    let end = TEAM_SCAN_END.min(cells.len());
    cells
        .get(1..end)?
        .iter()
        .map(|cell| clean_team_text(&cell.text))
        .find(|text| text.chars().count() > 2 && !text.chars().all(|c| c.is_ascii_digit()))
}

/// Whether `text` is a two-part wins-losses record such as `12-1`.
pub fn is_record(text: &str) -> bool {
    if text.chars().count() > MAX_RECORD_LEN || text.matches('-').count() != 1 {
        return false;
    }
    match text.split_once('-') {
        Some((wins, losses)) => is_digits(wins) && is_digits(losses),
        None => false,
    }
}

/// First wins-losses record among the cells following the rank.
pub fn detect_record(cells: &[Cell]) -> Option<String> {
    let end = RECORD_SCAN_END.min(cells.len());
    cells
        .get(1..end)?
        .iter()
        .map(|cell| cell.text.trim())
        .find(|text| is_record(text))
        .map(str::to_string)
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

/// Fields gathered for one row so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFields {
    pub rank: Option<RankCell>,
    pub team: Option<String>,
    pub record: Option<String>,
}

/// A single field detector in the row chain.
pub trait FieldDetector: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fill whatever fields this detector knows about and are still empty.
    fn detect(&self, cells: &[Cell], fields: &mut RowFields);
}

/// Rank from the first cell.
pub struct LeadingRank;

impl FieldDetector for LeadingRank {
    fn name(&self) -> &'static str {
        "leading-rank"
    }

    fn detect(&self, cells: &[Cell], fields: &mut RowFields) {
        if fields.rank.is_none() {
            fields.rank = cells.first().map(|c| detect_rank(&c.text));
        }
    }
}

/// Team from the first text-like cell after the rank.
pub struct PositionalTeam;

impl FieldDetector for PositionalTeam {
    fn name(&self) -> &'static str {
        "positional-team"
    }

    fn detect(&self, cells: &[Cell], fields: &mut RowFields) {
        if fields.team.is_none() {
            fields.team = detect_team(cells);
        }
    }
}

/// Record from the first `W-L` cell after the rank.
pub struct RecordPattern;

impl FieldDetector for RecordPattern {
    fn name(&self) -> &'static str {
        "record-pattern"
    }

    fn detect(&self, cells: &[Cell], fields: &mut RowFields) {
        if fields.record.is_none() {
            fields.record = detect_record(cells);
        }
    }
}

/// Why a row did or did not produce a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    Candidate(RawCandidate),
    TooShort,
    Header,
    InvalidRank,
    NoTeam,
}

/// Ordered chain of field detectors applied to every row.
pub struct RowHeuristics {
    detectors: Vec<Box<dyn FieldDetector>>,
}

impl Default for RowHeuristics {
    fn default() -> Self {
        Self {
            detectors: vec![
                Box::new(LeadingRank),
                Box::new(PositionalTeam),
                Box::new(RecordPattern),
            ],
        }
    }
}

impl RowHeuristics {
    /// Run `detector` before every existing one.
    pub fn push_front(mut self, detector: Box<dyn FieldDetector>) -> Self {
        self.detectors.insert(0, detector);
        self
    }

    /// Run `detector` after every existing one.
    pub fn push(mut self, detector: Box<dyn FieldDetector>) -> Self {
        self.detectors.push(detector);
        self
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Classify one row of cells.
    pub fn classify(&self, cells: &[Cell]) -> RowOutcome {
        if cells.len() < MIN_CELLS {
            return RowOutcome::TooShort;
        }

        let mut fields = RowFields::default();
        for detector in &self.detectors {
            detector.detect(cells, &mut fields);
            if matches!(fields.rank, Some(RankCell::Header | RankCell::Invalid)) {
                break;
            }
        }

        let rank = match fields.rank {
            Some(RankCell::Rank(rank)) => rank,
            Some(RankCell::Header) => return RowOutcome::Header,
            _ => return RowOutcome::InvalidRank,
        };
        match fields.team {
            Some(team) if !team.is_empty() => RowOutcome::Candidate(RawCandidate {
                rank,
                team,
                record: fields.record.unwrap_or_default(),
            }),
            _ => RowOutcome::NoTeam,
        }
    }
}
