//! `cfp-rankings inspect`: show what the rankings page offers.
//!
//! Loads the page once, lists its dropdowns and tables, and saves the
//! rendered markup so extraction can be replayed with `extract`.

use crate::cli::output::{self, Styled};
use crate::config::ScrapeConfig;
use crate::extraction::StrategyChain;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::session::RendererSession;
use crate::renderer::{ControlHandle, ControlKind, RenderContext, Renderer};
use anyhow::{anyhow, Context, Result};
use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Options shown per control.
const OPTION_PREVIEW: usize = 5;

#[derive(Debug, Clone, Default, Args)]
pub struct InspectArgs {
    /// Rankings page URL
    #[arg(long)]
    pub base_url: Option<String>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
    /// Browser binary to launch
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,
    /// Where to save the rendered markup
    #[arg(long, default_value = "page_snapshot.html")]
    pub save: PathBuf,
}

/// What one page load showed.
#[derive(Debug, Clone, Serialize)]
pub struct PageInspection {
    pub url: String,
    pub load_time_ms: u64,
    pub controls: Vec<ControlHandle>,
    pub tables: usize,
    /// Rows that look like rankings with the default extraction chain.
    pub candidates: usize,
    pub snapshot: PathBuf,
}

/// Load the page on `renderer`, describe it and save its markup to `save`.
pub async fn inspect_page(
    config: &ScrapeConfig,
    renderer: &dyn Renderer,
    save: PathBuf,
) -> Result<PageInspection> {
    let mut session = RendererSession::acquire(renderer).await?;
    let result = match session.context_mut() {
        Some(ctx) => describe(ctx, config, save).await,
        None => Err(anyhow!("session has no render context")),
    };
    if let Err(e) = session.release().await {
        warn!("failed to release renderer session: {e:#}");
    }
    result
}

async fn describe(
    ctx: &mut dyn RenderContext,
    config: &ScrapeConfig,
    save: PathBuf,
) -> Result<PageInspection> {
    let nav = ctx
        .navigate(&config.base_url, config.page_load_timeout_ms)
        .await
        .with_context(|| format!("loading {}", config.base_url))?;
    let controls = ctx.list_controls(ControlKind::Select).await?;
    let markup = ctx.markup_snapshot().await?;

    let outcome = StrategyChain::default().run(&markup);
    if let Some(parent) = save.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&save, &markup).with_context(|| format!("writing {}", save.display()))?;

    Ok(PageInspection {
        url: nav.final_url,
        load_time_ms: nav.load_time_ms,
        controls,
        tables: outcome.units.len(),
        candidates: outcome.candidate_count(),
        snapshot: save,
    })
}

pub async fn run(args: InspectArgs) -> Result<()> {
    let mut config = ScrapeConfig::from_env();
    if let Some(url) = &args.base_url {
        config.base_url = url.clone();
    }
    if args.headful {
        config.renderer.headless = false;
    }
    if let Some(path) = &args.chromium_path {
        config.renderer.chromium_path = Some(path.clone());
    }
    config.validate()?;

    let renderer = Arc::new(
        ChromiumRenderer::launch(&config.renderer)
            .await
            .context("starting browser")?,
    );
    let result = inspect_page(&config, renderer.as_ref(), args.save.clone()).await;
    if let Ok(renderer) = Arc::try_unwrap(renderer) {
        if let Err(e) = renderer.shutdown().await {
            warn!("browser shutdown: {e:#}");
        }
    }
    let inspection = result?;

    if output::is_json() {
        output::print_json(&serde_json::to_value(&inspection)?);
        return Ok(());
    }

    let s = Styled::new();
    output::print_header(&s);
    output::print_section(&s, "Page");
    output::print_check(s.ok_sym(), "URL:", &inspection.url);
    output::print_check(
        s.info_sym(),
        "Load time:",
        &output::format_duration_ms(inspection.load_time_ms),
    );
    eprintln!();

    output::print_section(&s, "Dropdowns");
    if inspection.controls.is_empty() {
        output::print_check(s.fail_sym(), "Selects:", "none found");
    }
    for control in &inspection.controls {
        let label = match &control.id {
            Some(id) => format!("#{id}"),
            None => format!("select[{}]", control.index),
        };
        output::print_check(
            s.info_sym(),
            &label,
            &format!(
                "{} options, selected {}",
                control.options.len(),
                control.selected.as_deref().unwrap_or("-")
            ),
        );
        let preview: Vec<&str> = control
            .options
            .iter()
            .take(OPTION_PREVIEW)
            .map(String::as_str)
            .collect();
        output::print_detail(&s.dim(&preview.join(", ")));
    }
    eprintln!();

    output::print_section(&s, "Content");
    output::print_check(s.info_sym(), "Tables:", &inspection.tables.to_string());
    output::print_check(
        s.info_sym(),
        "Ranking rows:",
        &inspection.candidates.to_string(),
    );
    output::print_check(
        s.ok_sym(),
        "Snapshot:",
        &inspection.snapshot.display().to_string(),
    );
    Ok(())
}
