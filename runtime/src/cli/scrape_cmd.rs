//! `cfp-rankings scrape`: run the orchestrator and export the results.

use crate::audit::AuditLogger;
use crate::cli::output::{self, Styled};
use crate::cli::progress;
use crate::config::ScrapeConfig;
use crate::export::{self, Summary};
use crate::rankings::RankingEntry;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::Renderer;
use crate::scrape::{CancelToken, Orchestrator, RunReport};
use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Args)]
pub struct ScrapeArgs {
    /// First season to scrape (inclusive)
    #[arg(long)]
    pub start_year: Option<i32>,
    /// Last season to scrape (inclusive)
    #[arg(long)]
    pub end_year: Option<i32>,
    /// Directory for the exported CSV files
    #[arg(long, short = 'o')]
    pub output_dir: Option<PathBuf>,
    /// Rankings page URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// Browser binary to launch
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,
    /// Upper bound on each settle wait, in milliseconds
    #[arg(long)]
    pub settle_timeout_ms: Option<u64>,
    /// Minimum pause after each selection, in milliseconds
    #[arg(long)]
    pub settle_floor_ms: Option<u64>,
    /// Also write entries and run report as JSON
    #[arg(long)]
    pub export_json: bool,
    /// Do not append to the audit log
    #[arg(long)]
    pub no_audit: bool,
}

impl ScrapeArgs {
    /// Overlay the flags that were given onto `config`.
    pub fn apply(&self, config: &mut ScrapeConfig) {
        if let Some(year) = self.start_year {
            config.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.end_year = year;
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if self.headful {
            config.renderer.headless = false;
        }
        if let Some(path) = &self.chromium_path {
            config.renderer.chromium_path = Some(path.clone());
        }
        if let Some(ms) = self.settle_timeout_ms {
            config.settle_timeout_ms = ms;
        }
        if let Some(ms) = self.settle_floor_ms {
            config.settle_floor_ms = ms;
        }
        if self.no_audit {
            config.audit_log = None;
        }
    }

    /// Defaults, then environment, then flags.
    pub fn resolve(&self) -> Result<ScrapeConfig> {
        let mut config = ScrapeConfig::from_env();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }
}

/// Everything a finished scrape produced.
pub struct ScrapeOutcome {
    pub entries: Vec<RankingEntry>,
    pub report: RunReport,
    pub files: Vec<PathBuf>,
    pub summary: Summary,
}

pub async fn run(args: ScrapeArgs, cancel: CancelToken) -> Result<()> {
    let config = args.resolve()?;

    let renderer = Arc::new(
        ChromiumRenderer::launch(&config.renderer)
            .await
            .context("starting browser")?,
    );
    let result = scrape_and_export(&config, renderer.clone(), cancel, args.export_json).await;

    if let Ok(renderer) = Arc::try_unwrap(renderer) {
        if let Err(e) = renderer.shutdown().await {
            warn!("browser shutdown: {e:#}");
        }
    }

    let outcome = result?;
    print_outcome(&outcome);

    if let Some(cause) = &outcome.report.load_error {
        bail!("rankings page could not be loaded: {cause}");
    }
    Ok(())
}

/// Scrape the configured range on `renderer` and write the export files.
pub async fn scrape_and_export(
    config: &ScrapeConfig,
    renderer: Arc<dyn Renderer>,
    cancel: CancelToken,
    export_json: bool,
) -> Result<ScrapeOutcome> {
    let mut orchestrator = Orchestrator::new(config.clone(), renderer).with_cancel(cancel);
    if let Some(path) = &config.audit_log {
        match AuditLogger::open(path) {
            Ok(audit) => {
                debug!(path = %audit.path().display(), "audit log open");
                orchestrator = orchestrator.with_audit(audit);
            }
            Err(e) => warn!("audit log disabled: {e:#}"),
        }
    }

    let spinner = (!output::is_quiet() && !output::is_json()).then(|| {
        progress::create_spinner(&format!(
            "Scraping {}-{} from {}",
            config.start_year, config.end_year, config.base_url
        ))
    });
    if let Some(bar) = spinner.clone() {
        orchestrator = orchestrator.on_unit(move |event| bar.set_message(progress::unit_message(event)));
    }

    let run = orchestrator.run(config.start_year, config.end_year).await;
    if let Some(bar) = &spinner {
        progress::finish(bar, "scrape finished");
    }
    let (mut entries, report) = run?;

    export::sort_for_export(&mut entries, &report);
    let mut files = Vec::new();
    if !entries.is_empty() {
        let now = Local::now();
        files.push(export::write_combined_csv(&config.output_dir, &entries, now)?);
        files.extend(export::write_per_year_csv(&config.output_dir, &entries)?);
        if export_json {
            let path = config
                .output_dir
                .join(format!("cfp_rankings_{}.json", now.format("%Y%m%d_%H%M%S")));
            export::write_json(&path, &entries, &report)?;
            files.push(path);
        }
    }

    let summary = export::summarize(&entries);
    Ok(ScrapeOutcome {
        entries,
        report,
        files,
        summary,
    })
}

fn print_outcome(outcome: &ScrapeOutcome) {
    let ScrapeOutcome {
        report,
        files,
        summary,
        ..
    } = outcome;

    if output::is_json() {
        output::print_json(&serde_json::json!({
            "summary": summary,
            "report": report,
            "files": files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        }));
        return;
    }
    if output::is_quiet() {
        return;
    }

    let s = Styled::new();
    eprintln!();
    output::print_header(&s);

    output::print_section(&s, "Run");
    let elapsed = match (report.started_at, report.finished_at) {
        (Some(start), Some(end)) => {
            output::format_duration_ms((end - start).num_milliseconds().max(0) as u64)
        }
        _ => "-".to_string(),
    };
    let sym = if report.failed.is_empty() && report.failed_years.is_empty() {
        s.ok_sym()
    } else {
        s.warn_sym()
    };
    output::print_check(
        sym,
        "Units:",
        &format!(
            "{} of {} scraped in {elapsed}",
            report.succeeded, report.attempted
        ),
    );
    for failed in &report.failed {
        output::print_detail(&format!("{} {}: {}", s.fail_sym(), failed.target, failed.cause));
    }
    for failed in &report.failed_years {
        output::print_detail(&format!("{} {}: {}", s.fail_sym(), failed.year, failed.cause));
    }
    if !report.empty.is_empty() {
        output::print_check(
            s.info_sym(),
            "Empty weeks:",
            &report.empty.len().to_string(),
        );
        if output::is_verbose() {
            for target in &report.empty {
                output::print_detail(&target.to_string());
            }
        }
    }
    if report.rejected_total() > 0 {
        let reasons: Vec<String> = report
            .rejected
            .iter()
            .map(|(reason, n)| format!("{reason} {n}"))
            .collect();
        output::print_check(
            s.warn_sym(),
            "Rejected rows:",
            &format!("{} ({})", report.rejected_total(), reasons.join(", ")),
        );
    }
    if output::is_verbose() {
        let skipped = &report.skipped_rows;
        output::print_check(
            s.info_sym(),
            "Skipped rows:",
            &format!(
                "{} header, {} short, {} bad rank, {} no team",
                skipped.header, skipped.too_short, skipped.invalid_rank, skipped.no_team
            ),
        );
    }
    if report.cancelled {
        output::print_check(s.warn_sym(), "Cancelled:", "stopped early, partial results kept");
    }
    if let Some(cause) = &report.load_error {
        output::print_check(s.fail_sym(), "Page load:", cause);
    }
    eprintln!();

    output::print_section(&s, "Summary");
    output::print_check(s.info_sym(), "Rankings:", &summary.total.to_string());
    if let (Some(first), Some(last)) = (summary.years.first(), summary.years.last()) {
        output::print_check(
            s.info_sym(),
            "Years:",
            &format!("{first}-{last} ({} seasons)", summary.years.len()),
        );
    }
    for (year, weeks) in &summary.weeks_per_year {
        output::print_detail(&format!("{year}: {weeks} weeks"));
    }
    output::print_check(s.info_sym(), "Unique teams:", &summary.unique_teams.to_string());
    eprintln!();

    output::print_section(&s, "Output");
    if files.is_empty() {
        output::print_check(s.warn_sym(), "Files:", "nothing to export");
    }
    for file in files {
        output::print_check(s.ok_sym(), "Wrote:", &file.display().to_string());
    }

    let status = if report.load_error.is_some() {
        s.red("FAILED")
    } else if report.failed.is_empty() && report.failed_years.is_empty() && !report.cancelled {
        s.green("COMPLETE")
    } else {
        s.yellow("PARTIAL")
    };
    output::print_status(&s, &status, &format!("{} rankings", summary.total));
}
