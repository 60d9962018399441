//! Error taxonomy for a scrape run.
//!
//! Only [`ScrapeError::SessionAcquisition`] is fatal to a run. Navigation
//! errors are per-unit and get folded into the run report by the orchestrator.

use std::time::Duration;
use thiserror::Error;

/// A selection control is missing or stale, an option is absent, or the
/// page never settled. Always scoped to a single `(year, week)` unit.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NavigationError {
    #[error("page failed to load: {0}")]
    PageLoad(String),
    #[error("selection control #{0} not found")]
    ControlMissing(usize),
    #[error("option {text:?} not present in control #{control}")]
    OptionMissing { control: usize, text: String },
    #[error("week options requested before a year was selected")]
    YearNotSelected,
    #[error("content did not settle within {0:?}")]
    SettleTimeout(Duration),
    #[error("renderer error: {0}")]
    Renderer(String),
}

/// Failure to bring up the renderer session itself.
#[derive(Debug, Error)]
#[error("renderer session could not be acquired: {reason}")]
pub struct SessionAcquisitionFailure {
    pub reason: String,
}

impl SessionAcquisitionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can escape [`crate::scrape::Orchestrator::run`].
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error(transparent)]
    SessionAcquisition(#[from] SessionAcquisitionFailure),
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid or inconsistent configuration values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("start year {start} is after end year {end}")]
    InvertedRange { start: i32, end: i32 },
    #[error("invalid base url {url:?}: {reason}")]
    BaseUrl { url: String, reason: String },
}

/// Errors writing export files.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("io error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
