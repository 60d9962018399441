//! Export of a finished run: combined CSV, per-year CSVs, JSON.

pub mod csv;

use crate::error::ExportError;
use crate::rankings::RankingEntry;
use crate::scrape::RunReport;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Order entries by `(year, week presentation order, rank)`.
///
/// Weeks missing from `report.week_order` sort after the known ones, by label.
pub fn sort_for_export(entries: &mut [RankingEntry], report: &RunReport) {
    entries.sort_by(|a, b| {
        let pos_a = report.week_position(a.year, &a.week).unwrap_or(usize::MAX);
        let pos_b = report.week_position(b.year, &b.week).unwrap_or(usize::MAX);
        a.year
            .cmp(&b.year)
            .then(pos_a.cmp(&pos_b))
            .then_with(|| a.week.cmp(&b.week))
            .then(a.rank.cmp(&b.rank))
    });
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn write_csv(path: &Path, entries: &[&RankingEntry]) -> Result<(), ExportError> {
    let file = File::create(path).map_err(io_err(path))?;
    let mut w = BufWriter::new(file);
    csv::write_row(&mut w, &csv::HEADER).map_err(io_err(path))?;
    for e in entries {
        let row = [
            e.year.to_string(),
            e.week.clone(),
            e.rank.to_string(),
            e.team.clone(),
            e.record.clone(),
            e.scraped_at.to_rfc3339(),
        ];
        csv::write_row(&mut w, &row).map_err(io_err(path))?;
    }
    w.flush().map_err(io_err(path))
}

/// Write every entry to `cfp_rankings_<timestamp>.csv` in `dir`.
pub fn write_combined_csv(
    dir: &Path,
    entries: &[RankingEntry],
    at: DateTime<Local>,
) -> Result<PathBuf, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let path = dir.join(format!("cfp_rankings_{}.csv", at.format("%Y%m%d_%H%M%S")));
    write_csv(&path, &entries.iter().collect::<Vec<_>>())?;
    info!("wrote {} rankings to {}", entries.len(), path.display());
    Ok(path)
}

/// Write one `cfp_rankings_<year>.csv` per year present in `entries`.
pub fn write_per_year_csv(dir: &Path, entries: &[RankingEntry]) -> Result<Vec<PathBuf>, ExportError> {
    std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    let mut by_year: BTreeMap<i32, Vec<&RankingEntry>> = BTreeMap::new();
    for e in entries {
        by_year.entry(e.year).or_default().push(e);
    }

    let mut paths = Vec::with_capacity(by_year.len());
    for (year, rows) in by_year {
        let path = dir.join(format!("cfp_rankings_{year}.csv"));
        write_csv(&path, &rows)?;
        info!("wrote {} rankings to {}", rows.len(), path.display());
        paths.push(path);
    }
    Ok(paths)
}

#[derive(Serialize)]
struct JsonExport<'a> {
    report: &'a RunReport,
    entries: &'a [RankingEntry],
}

/// Write entries plus the run report as one JSON document.
pub fn write_json(path: &Path, entries: &[RankingEntry], report: &RunReport) -> Result<(), ExportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let file = File::create(path).map_err(io_err(path))?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut w, &JsonExport { report, entries })?;
    w.flush().map_err(io_err(path))
}

/// Headline numbers for a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub years: Vec<i32>,
    /// Distinct weeks with at least one ranking, per year.
    pub weeks_per_year: BTreeMap<i32, usize>,
    pub unique_teams: usize,
}

pub fn summarize(entries: &[RankingEntry]) -> Summary {
    let mut weeks: BTreeMap<i32, BTreeSet<&str>> = BTreeMap::new();
    let mut teams = BTreeSet::new();
    for e in entries {
        weeks.entry(e.year).or_default().insert(e.week.as_str());
        teams.insert(e.team.as_str());
    }
    Summary {
        total: entries.len(),
        years: weeks.keys().copied().collect(),
        weeks_per_year: weeks.iter().map(|(y, w)| (*y, w.len())).collect(),
        unique_teams: teams.len(),
    }
}
