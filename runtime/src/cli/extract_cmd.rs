//! `cfp-rankings extract`: run extraction offline on a saved page.

use crate::cli::output::{self, Styled};
use crate::extraction::{ExtractionOutcome, StrategyChain};
use crate::rankings::{assemble, AssembledBatch, RawCandidate};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Debug, Clone, Args)]
pub struct ExtractArgs {
    /// Saved HTML snapshot of a rankings page
    pub file: PathBuf,
    /// Season to stamp on assembled entries
    #[arg(long, requires = "week")]
    pub year: Option<i32>,
    /// Week label to stamp on assembled entries
    #[arg(long, requires = "year")]
    pub week: Option<String>,
}

/// What one snapshot yielded.
pub struct ExtractReport {
    pub outcome: ExtractionOutcome,
    /// Present when a year and week were given.
    pub batch: Option<AssembledBatch>,
}

pub fn extract_file(args: &ExtractArgs) -> Result<ExtractReport> {
    let markup = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let outcome = StrategyChain::default().run(&markup);
    let batch = match (args.year, args.week.as_deref()) {
        (Some(year), Some(week)) => Some(assemble(outcome.candidates(), year, week)),
        _ => None,
    };
    Ok(ExtractReport { outcome, batch })
}

pub async fn run(args: ExtractArgs) -> Result<()> {
    let report = extract_file(&args)?;

    if output::is_json() {
        let value = match &report.batch {
            Some(batch) => serde_json::json!({
                "strategy": report.outcome.strategy,
                "entries": batch.entries,
                "rejections": batch.rejections,
            }),
            None => serde_json::json!({
                "strategy": report.outcome.strategy,
                "candidates": report.outcome.candidates(),
            }),
        };
        output::print_json(&value);
        return Ok(());
    }

    let s = Styled::new();
    if !output::is_quiet() {
        output::print_header(&s);
        output::print_section(&s, "Tables");
        if report.outcome.units.is_empty() {
            output::print_check(s.warn_sym(), "Tables:", "none found");
        }
        for unit in &report.outcome.units {
            let sym = if unit.is_zero_rows() {
                s.info_sym()
            } else {
                s.ok_sym()
            };
            output::print_check(
                sym,
                &unit.label,
                &format!("{} rows, {} candidates", unit.rows, unit.candidates.len()),
            );
        }
        eprintln!();
    }

    match &report.batch {
        Some(batch) => {
            for e in &batch.entries {
                println!("{:>2}  {:<36} {}", e.rank, e.team, e.record);
            }
            for r in &batch.rejections {
                eprintln!(
                    "  {} rank {} {:?}: {:?}",
                    s.warn_sym(),
                    r.rank,
                    r.team,
                    r.reason
                );
            }
        }
        None => print_candidates(&report.outcome.candidates()),
    }
    Ok(())
}

fn print_candidates(candidates: &[RawCandidate]) {
    for c in candidates {
        println!("{:>2}  {:<36} {}", c.rank, c.team, c.record);
    }
}
