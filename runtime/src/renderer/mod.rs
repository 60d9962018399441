//! Renderable page abstraction.
//!
//! The scraper never talks to a browser directly. It drives a
//! [`RenderContext`] handed out by a [`Renderer`]; the Chromium-backed
//! implementation lives in [`chromium`], and tests use a scripted page.

pub mod chromium;
pub mod session;

#[cfg(test)]
pub(crate) mod scripted;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Outcome of a top-level page navigation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigationResult {
    /// URL after redirects.
    pub final_url: String,
    /// HTTP status when known (0 otherwise).
    pub status: u16,
    /// Wall-clock time spent loading.
    pub load_time_ms: u64,
}

/// Kinds of interactive controls the scraper knows how to enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlKind {
    /// A `<select>` dropdown.
    Select,
}

/// Snapshot of one control as it looked when it was listed.
///
/// Handles are addressed by document-order index, so a handle goes stale
/// when the page re-renders its controls. Re-list after every selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlHandle {
    /// Position among controls of the same kind, in document order.
    pub index: usize,
    /// DOM id, if the control has one.
    pub id: Option<String>,
    /// Visible option texts, trimmed, in presentation order.
    pub options: Vec<String>,
    /// Visible text of the currently selected option.
    pub selected: Option<String>,
}

impl ControlHandle {
    /// Whether `text` is exactly one of this control's visible options.
    pub fn has_option(&self, text: &str) -> bool {
        self.options.iter().any(|o| o == text)
    }
}

/// A live, rendered page.
#[async_trait]
pub trait RenderContext: Send + Sync {
    /// Load `url` and wait for the load event, bounded by `timeout_ms`.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;

    /// Enumerate the controls of `kind` currently present, in document order.
    async fn list_controls(&self, kind: ControlKind) -> Result<Vec<ControlHandle>>;

    /// Select the option whose trimmed visible text equals `text`.
    ///
    /// Returns `Ok(false)` when the control or the option is gone.
    async fn select_option_by_visible_text(
        &mut self,
        control: &ControlHandle,
        text: &str,
    ) -> Result<bool>;

    /// Full rendered markup of the current document.
    async fn markup_snapshot(&self) -> Result<String>;

    /// Evaluate a script in the page and return its JSON result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;

    /// Current document URL.
    async fn get_url(&self) -> Result<String>;

    /// Close the page and release everything it holds.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Factory for render contexts.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a fresh page.
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;
}
