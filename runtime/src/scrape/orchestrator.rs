//! Scrape orchestrator.
//!
//! Owns the single render session for a run and walks every selected year
//! and each of its weeks. Failures are isolated per unit and per year; only
//! failing to acquire the session aborts the run.

use crate::audit::{AuditLogger, UnitEvent, UnitStatus};
use crate::config::ScrapeConfig;
use crate::error::{ConfigError, ScrapeError, SessionAcquisitionFailure};
use crate::extraction::StrategyChain;
use crate::navigation::{DropdownNavigator, WaitConfig};
use crate::rankings::{assemble, RankingEntry, YearWeekTarget};
use crate::renderer::session::RendererSession;
use crate::renderer::{RenderContext, Renderer};
use crate::scrape::cancel::CancelToken;
use crate::scrape::report::{FailedYear, RunReport};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

type UnitObserver = Box<dyn Fn(&UnitEvent) + Send + Sync>;

/// Drives a full scrape run.
pub struct Orchestrator {
    config: ScrapeConfig,
    renderer: Arc<dyn Renderer>,
    chain: StrategyChain,
    cancel: CancelToken,
    audit: Option<AuditLogger>,
    observer: Option<UnitObserver>,
}

impl Orchestrator {
    pub fn new(config: ScrapeConfig, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            config,
            renderer,
            chain: StrategyChain::default(),
            cancel: CancelToken::new(),
            audit: None,
            observer: None,
        }
    }

    /// Replace the extraction chain.
    pub fn with_chain(mut self, chain: StrategyChain) -> Self {
        self.chain = chain;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_audit(mut self, audit: AuditLogger) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Called after every unit, for progress display.
    pub fn on_unit(mut self, observer: impl Fn(&UnitEvent) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn wait_config(&self) -> WaitConfig {
        WaitConfig {
            timeout: self.config.settle_timeout(),
            poll_interval: self.config.poll_interval(),
            floor: self.config.settle_floor(),
        }
    }

    /// Scrape every week of every offered year in `start_year..=end_year`.
    pub async fn run(
        &mut self,
        start_year: i32,
        end_year: i32,
    ) -> Result<(Vec<RankingEntry>, RunReport), ScrapeError> {
        if start_year > end_year {
            return Err(ConfigError::InvertedRange {
                start: start_year,
                end: end_year,
            }
            .into());
        }

        let mut session = match RendererSession::acquire(self.renderer.as_ref()).await {
            Ok(session) => session,
            Err(e) => {
                error!("{e}");
                return Err(e.into());
            }
        };

        let mut report = RunReport {
            started_at: Some(Utc::now()),
            ..RunReport::default()
        };
        let mut entries = Vec::new();

        let Some(ctx) = session.context_mut() else {
            let failure = SessionAcquisitionFailure::new("session has no render context");
            error!("{failure}");
            return Err(failure.into());
        };
        self.drive(ctx, start_year, end_year, &mut entries, &mut report)
            .await;

        if let Err(e) = session.release().await {
            warn!("failed to release renderer session: {e:#}");
        }

        report.entries = entries.len();
        report.finished_at = Some(Utc::now());
        info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            entries = report.entries,
            "scrape finished"
        );
        Ok((entries, report))
    }

    async fn drive(
        &mut self,
        ctx: &mut dyn RenderContext,
        start_year: i32,
        end_year: i32,
        entries: &mut Vec<RankingEntry>,
        report: &mut RunReport,
    ) {
        let mut nav = DropdownNavigator::new(
            ctx,
            self.config.base_url.clone(),
            self.config.page_load_timeout_ms,
            self.wait_config(),
        );

        if let Err(e) = nav.load().await {
            error!("cannot load rankings page: {e}");
            report.load_error = Some(e.to_string());
            return;
        }

        let offered = match nav.discover_years().await {
            Ok(years) => years,
            Err(e) => {
                error!("cannot read year options: {e}");
                report.load_error = Some(e.to_string());
                return;
            }
        };

        report.years = select_years(&offered, start_year, end_year);
        info!("will scrape years {:?}", report.years);

        for year in report.years.clone() {
            if self.cancel.is_cancelled() {
                info!("run cancelled before year {year}");
                report.cancelled = true;
                break;
            }
            self.scrape_year(&mut nav, &year, entries, report).await;
        }
    }

    async fn scrape_year(
        &mut self,
        nav: &mut DropdownNavigator<'_>,
        year: &str,
        entries: &mut Vec<RankingEntry>,
        report: &mut RunReport,
    ) {
        let Ok(year_num) = year.parse::<i32>() else {
            return;
        };

        let weeks = match nav.select_year(year).await {
            Ok(()) => nav.discover_weeks().await,
            Err(e) => Err(e),
        };
        let weeks = match weeks {
            Ok(weeks) => weeks,
            Err(e) => {
                warn!(year, cause = %e, "year skipped");
                report.failed_years.push(FailedYear {
                    year: year.to_string(),
                    cause: e.to_string(),
                });
                if let Err(e) = nav.load().await {
                    warn!("reload after year failure failed: {e}");
                }
                return;
            }
        };
        let weeks = distinct_labels(weeks);
        info!(year, weeks = weeks.len(), "weeks discovered");
        report.week_order.insert(year.to_string(), weeks.clone());

        let before = entries.len();
        for week in weeks {
            if self.cancel.is_cancelled() {
                info!("run cancelled at {year} / {week}");
                report.cancelled = true;
                return;
            }
            let target = YearWeekTarget::new(year, week);
            self.scrape_unit(nav, &target, year_num, entries, report).await;
        }
        info!(year, rankings = entries.len() - before, "year complete");
    }

    async fn scrape_unit(
        &mut self,
        nav: &mut DropdownNavigator<'_>,
        target: &YearWeekTarget,
        year: i32,
        entries: &mut Vec<RankingEntry>,
        report: &mut RunReport,
    ) {
        let started = Instant::now();

        // A cancelled selection is abandoned and not counted as attempted.
        let cancel = self.cancel.clone();
        let selected = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = nav.try_select_target(target) => Some(result),
        };
        let Some(selected) = selected else {
            info!(year = %target.year, week = %target.week, "run cancelled mid-selection");
            report.cancelled = true;
            return;
        };
        report.attempted += 1;

        let snapshot = match selected {
            Ok(()) => nav.snapshot().await,
            Err(e) => Err(e),
        };
        let snapshot = match snapshot {
            Ok(markup) => markup,
            Err(e) => {
                warn!(year = %target.year, week = %target.week, cause = %e, "unit failed");
                report.record_failure(target.clone(), e.to_string());
                let mut event = UnitEvent::new(&target.year, &target.week, UnitStatus::Failed);
                event.cause = Some(e.to_string());
                event.duration_ms = started.elapsed().as_millis() as u64;
                self.emit(&event);
                return;
            }
        };

        let outcome = self.chain.run(&snapshot);
        for unit in &outcome.units {
            report.add_skipped(&unit.skipped);
        }
        let batch = assemble(outcome.candidates(), year, &target.week);
        for rejection in &batch.rejections {
            report.record_rejection(rejection.reason);
        }
        report.succeeded += 1;

        let status = if batch.entries.is_empty() {
            warn!(year = %target.year, week = %target.week, "zero rows for this unit");
            report.empty.push(target.clone());
            UnitStatus::Empty
        } else {
            debug!(strategy = ?outcome.strategy, "extraction strategy");
            info!(
                year = %target.year,
                week = %target.week,
                rankings = batch.entries.len(),
                "unit scraped"
            );
            UnitStatus::Ok
        };

        let mut event = UnitEvent::new(&target.year, &target.week, status);
        event.rows = batch.entries.len();
        event.rejected = batch.rejections.len();
        event.duration_ms = started.elapsed().as_millis() as u64;
        self.emit(&event);

        entries.extend(batch.entries);
    }

    fn emit(&mut self, event: &UnitEvent) {
        if let Some(audit) = self.audit.as_mut() {
            if let Err(e) = audit.log(event) {
                warn!("audit log write failed: {e:#}");
            }
        }
        if let Some(observer) = &self.observer {
            observer(event);
        }
    }
}

/// Offered year labels that parse as years inside `start..=end`, in the
/// order the page presents them. Repeated labels are kept once.
pub fn select_years(offered: &[String], start: i32, end: i32) -> Vec<String> {
    let in_range = offered
        .iter()
        .filter(|label| match label.parse::<i32>() {
            Ok(year) => (start..=end).contains(&year),
            Err(_) => {
                debug!("ignoring non-numeric year option {label:?}");
                false
            }
        })
        .cloned();
    distinct_labels(in_range)
}

/// First occurrence of each label, in order. Selection is by visible text,
/// so a repeated option would land on the same unit twice.
fn distinct_labels(labels: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .into_iter()
        .filter(|label| {
            let fresh = seen.insert(label.clone());
            if !fresh {
                debug!("ignoring repeated option {label:?}");
            }
            fresh
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::{ScriptedRenderer, ScriptedSite};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn test_config() -> ScrapeConfig {
        ScrapeConfig {
            base_url: "scripted://rankings".to_string(),
            settle_timeout_ms: 100,
            poll_interval_ms: 1,
            audit_log: None,
            ..ScrapeConfig::default()
        }
    }

    fn ascending_site() -> ScriptedSite {
        let mut site = ScriptedSite::cfp_like();
        site.years.reverse();
        site
    }

    #[test]
    fn test_select_years_intersects_range() {
        let offered: Vec<String> = ["2024", "2023", "All-Time", "2015", "2014", "2013"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            select_years(&offered, 2014, 2023),
            vec!["2023", "2015", "2014"]
        );
        assert!(select_years(&offered, 1990, 1999).is_empty());

        let repeated: Vec<String> = ["2023", "2023", "2022", "2023"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(select_years(&repeated, 2022, 2023), vec!["2023", "2022"]);
    }

    #[tokio::test]
    async fn test_repeated_week_label_scraped_once() {
        let mut site = ScriptedSite::cfp_like();
        site.years[0].1 = ["Week 5", "Week 5", "Final"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let renderer = Arc::new(ScriptedRenderer::new(site));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone());
        let (entries, report) = orchestrator.run(2023, 2023).await.unwrap();

        assert_eq!(report.attempted, 2);
        assert_eq!(report.succeeded, 2);
        assert!(report.is_consistent());
        assert_eq!(report.week_order["2023"], vec!["Week 5", "Final"]);
        assert_eq!(entries.len(), 2 * 5);

        let mut seen = HashSet::new();
        for entry in &entries {
            assert!(seen.insert((entry.year, entry.week.clone(), entry.rank)));
        }
        assert!(renderer.all_closed());
    }

    #[tokio::test]
    async fn test_run_collects_every_week() {
        let renderer = Arc::new(ScriptedRenderer::new(ScriptedSite::cfp_like()));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone());
        let (entries, report) = orchestrator.run(2021, 2023).await.unwrap();

        assert_eq!(report.years, vec!["2023", "2022", "2021"]);
        assert_eq!(report.attempted, 12);
        assert_eq!(report.succeeded, 12);
        assert!(report.failed.is_empty());
        assert!(report.is_consistent());
        // Preseason renders no table in every year.
        assert_eq!(report.empty.len(), 3);
        assert_eq!(entries.len(), 3 * 3 * 5);
        assert_eq!(report.entries, entries.len());
        assert!(renderer.all_closed());

        // Ranks are in range and unique within each (year, week).
        let mut seen = HashSet::new();
        for entry in &entries {
            assert!((1..=25).contains(&entry.rank));
            assert!(seen.insert((entry.year, entry.week.clone(), entry.rank)));
        }

        // The content for each unit is the one that was selected.
        let final_2022: Vec<_> = entries
            .iter()
            .filter(|e| e.year == 2022 && e.week == "Final")
            .collect();
        assert_eq!(final_2022.len(), 5);
    }

    #[tokio::test]
    async fn test_failed_unit_is_isolated() {
        let mut site = ascending_site();
        site.unselectable
            .insert(("2021".to_string(), "Week 5".to_string()));
        let renderer = Arc::new(ScriptedRenderer::new(site));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone());
        let (entries, report) = orchestrator.run(2021, 2023).await.unwrap();

        assert_eq!(
            report.failed_pairs(),
            vec![("2021".to_string(), "Week 5".to_string())]
        );
        assert_eq!(report.attempted, 12);
        assert_eq!(report.succeeded, 11);
        assert!(report.is_consistent());

        let weeks_2021: HashSet<_> = entries
            .iter()
            .filter(|e| e.year == 2021)
            .map(|e| e.week.as_str())
            .collect();
        assert_eq!(weeks_2021, HashSet::from(["Week 6", "Final"]));
        assert!(entries.iter().any(|e| e.year == 2022));
        assert!(entries.iter().any(|e| e.year == 2023));
        assert!(renderer.all_closed());
    }

    #[tokio::test]
    async fn test_failed_year_is_isolated() {
        let mut site = ascending_site();
        site.missing_week_control.insert("2022".to_string());
        let renderer = Arc::new(ScriptedRenderer::new(site));
        let mut orchestrator = Orchestrator::new(test_config(), renderer);
        let (entries, report) = orchestrator.run(2021, 2023).await.unwrap();

        assert_eq!(report.failed_years.len(), 1);
        assert_eq!(report.failed_years[0].year, "2022");
        assert!(!report.week_order.contains_key("2022"));
        let years: HashSet<i32> = entries.iter().map(|e| e.year).collect();
        assert_eq!(years, HashSet::from([2021, 2023]));
    }

    #[tokio::test]
    async fn test_acquisition_failure_is_fatal() {
        let mut renderer = ScriptedRenderer::new(ScriptedSite::cfp_like());
        renderer.fail_acquire = true;
        let mut orchestrator = Orchestrator::new(test_config(), Arc::new(renderer));
        let err = orchestrator.run(2021, 2023).await.unwrap_err();
        assert!(matches!(err, ScrapeError::SessionAcquisition(_)));
    }

    #[tokio::test]
    async fn test_page_load_failure_reported_and_session_released() {
        let mut site = ScriptedSite::cfp_like();
        site.fail_load = true;
        let renderer = Arc::new(ScriptedRenderer::new(site));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone());
        let (entries, report) = orchestrator.run(2021, 2023).await.unwrap();
        assert!(entries.is_empty());
        assert!(report.load_error.is_some());
        assert_eq!(report.attempted, 0);
        assert!(renderer.all_closed());
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let renderer = Arc::new(ScriptedRenderer::new(ScriptedSite::cfp_like()));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone());
        let err = orchestrator.run(2023, 2021).await.unwrap_err();
        assert!(matches!(err, ScrapeError::Config(_)));
        assert!(renderer.opened.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_between_units_still_releases() {
        let renderer = Arc::new(ScriptedRenderer::new(ScriptedSite::cfp_like()));
        let cancel = CancelToken::new();
        let units = Arc::new(AtomicUsize::new(0));
        let mut orchestrator = Orchestrator::new(test_config(), renderer.clone())
            .with_cancel(cancel.clone())
            .on_unit({
                let units = Arc::clone(&units);
                move |_event| {
                    if units.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
                        cancel.cancel();
                    }
                }
            });
        let (_, report) = orchestrator.run(2021, 2023).await.unwrap();
        assert!(report.cancelled);
        assert_eq!(report.attempted, 2);
        assert_eq!(units.load(Ordering::SeqCst), 2);
        assert!(renderer.all_closed());
    }

    #[tokio::test]
    async fn test_audit_log_written_per_unit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let renderer = Arc::new(ScriptedRenderer::new(ScriptedSite::cfp_like()));
        let mut orchestrator = Orchestrator::new(test_config(), renderer)
            .with_audit(AuditLogger::open(&path).unwrap());
        orchestrator.run(2023, 2023).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let events: Vec<UnitEvent> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(events.len(), 4);
        let by_week: HashMap<_, _> = events
            .iter()
            .map(|e| (e.week.as_str(), e.status))
            .collect();
        assert_eq!(by_week["Preseason"], UnitStatus::Empty);
        assert_eq!(by_week["Final"], UnitStatus::Ok);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pending_selection() {
        let mut site = ScriptedSite::cfp_like();
        site.unresponsive
            .insert(("2023".to_string(), "Week 5".to_string()));
        let renderer = Arc::new(ScriptedRenderer::new(site));
        let cancel = CancelToken::new();
        let config = ScrapeConfig {
            settle_timeout_ms: 10_000,
            ..test_config()
        };
        let mut orchestrator =
            Orchestrator::new(config, renderer.clone()).with_cancel(cancel.clone());

        let trigger = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });
        let (entries, report) =
            tokio::time::timeout(Duration::from_secs(2), orchestrator.run(2021, 2023))
                .await
                .expect("cancel did not interrupt the pending selection")
                .unwrap();
        trigger.await.unwrap();

        assert!(report.cancelled);
        // Preseason finished; the interrupted Week 5 is not counted.
        assert_eq!(report.attempted, 1);
        assert!(report.failed.is_empty());
        assert!(report.is_consistent());
        assert!(entries.is_empty());
        assert!(renderer.all_closed());
    }
}
