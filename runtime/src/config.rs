//! Run configuration.
//!
//! Values resolve as CLI flag > environment variable > default. The CLI
//! layer fills in flags; [`ScrapeConfig::from_env`] covers the rest.

use crate::error::ConfigError;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Rankings page with the year and week dropdowns.
pub const DEFAULT_BASE_URL: &str = "https://collegefootballplayoff.com/rankings.aspx";

/// First season the playoff committee published rankings.
pub const DEFAULT_START_YEAR: i32 = 2014;

/// Browser launch options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RendererConfig {
    pub headless: bool,
    /// Explicit browser binary; looked up on the system when unset.
    pub chromium_path: Option<PathBuf>,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chromium_path: None,
            window_width: 1920,
            window_height: 1080,
        }
    }
}

/// Everything a scrape run needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    pub base_url: String,
    /// Inclusive.
    pub start_year: i32,
    /// Inclusive.
    pub end_year: i32,
    pub output_dir: PathBuf,
    pub renderer: RendererConfig,
    pub page_load_timeout_ms: u64,
    pub settle_timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Minimum pause after each selection, on top of the settle wait.
    pub settle_floor_ms: u64,
    pub audit_log: Option<PathBuf>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            start_year: DEFAULT_START_YEAR,
            end_year: chrono::Local::now().year(),
            output_dir: PathBuf::from("output"),
            renderer: RendererConfig::default(),
            page_load_timeout_ms: 30_000,
            settle_timeout_ms: 10_000,
            poll_interval_ms: 250,
            settle_floor_ms: 0,
            audit_log: Some(rankings_home().join("audit.jsonl")),
        }
    }
}

impl ScrapeConfig {
    /// Defaults overlaid with `RANKINGS_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(url) = std::env::var("RANKINGS_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(path) = std::env::var("RANKINGS_CHROMIUM_PATH") {
            config.renderer.chromium_path = Some(PathBuf::from(path));
        }
        if let Ok(dir) = std::env::var("RANKINGS_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        config
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.start_year > self.end_year {
            return Err(ConfigError::InvertedRange {
                start: self.start_year,
                end: self.end_year,
            });
        }
        let parsed = url::Url::parse(&self.base_url).map_err(|e| ConfigError::BaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https" | "file") {
            return Err(ConfigError::BaseUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", parsed.scheme()),
            });
        }
        Ok(())
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_floor(&self) -> Duration {
        Duration::from_millis(self.settle_floor_ms)
    }
}

/// State directory (`~/.rankings/`), overridable with `RANKINGS_HOME`.
pub fn rankings_home() -> PathBuf {
    if let Ok(p) = std::env::var("RANKINGS_HOME") {
        return PathBuf::from(p);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(".rankings")
}
