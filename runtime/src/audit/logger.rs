//! JSONL audit logger: one line per scraped unit.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// How a unit ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitStatus {
    Ok,
    /// Navigated fine, no ranking rows on the page.
    Empty,
    Failed,
}

/// A single audit event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitEvent {
    pub timestamp: String,
    pub year: String,
    pub week: String,
    pub status: UnitStatus,
    pub rows: usize,
    pub rejected: usize,
    pub duration_ms: u64,
    pub cause: Option<String>,
}

impl UnitEvent {
    pub fn new(year: &str, week: &str, status: UnitStatus) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            year: year.to_string(),
            week: week.to_string(),
            status,
            rows: 0,
            rejected: 0,
            duration_ms: 0,
            cause: None,
        }
    }
}

/// Append-only JSONL audit logger.
pub struct AuditLogger {
    file: File,
    path: PathBuf,
}

impl AuditLogger {
    /// Open or create the audit log file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open audit log: {}", path.display()))?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Log an audit event.
    pub fn log(&mut self, event: &UnitEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }
}
