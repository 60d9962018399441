//! Chromium-backed renderer built on `chromiumoxide`.

use super::{ControlHandle, ControlKind, NavigationResult, RenderContext, Renderer};
use crate::config::RendererConfig;
use crate::error::SessionAcquisitionFailure;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Lists every `<select>` with its trimmed, non-empty option texts.
const LIST_SELECTS_JS: &str = r#"
(() => Array.from(document.querySelectorAll('select')).map((sel, index) => {
    const options = Array.from(sel.options)
        .map(o => (o.text || '').trim())
        .filter(t => t.length > 0);
    const current = sel.selectedIndex >= 0 ? sel.options[sel.selectedIndex] : null;
    return {
        index: index,
        id: sel.id || null,
        options: options,
        selected: current ? (current.text || '').trim() : null
    };
}))()
"#;

/// Browser-side view of one `<select>`, as returned by [`LIST_SELECTS_JS`].
#[derive(Debug, Deserialize)]
struct SelectInfo {
    index: usize,
    id: Option<String>,
    options: Vec<String>,
    selected: Option<String>,
}

/// Locate a Chromium binary.
///
/// Order: explicit override, `RANKINGS_CHROMIUM_PATH`, `PATH` lookup, then
/// the usual macOS install location.
pub fn find_chromium(explicit: Option<&PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.clone());
        }
    }

    if let Ok(p) = std::env::var("RANKINGS_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    for name in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A launched browser process plus its CDP event pump.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: Option<JoinHandle<()>>,
}

impl ChromiumRenderer {
    /// Launch the browser.
    pub async fn launch(config: &RendererConfig) -> Result<Self, SessionAcquisitionFailure> {
        let executable = find_chromium(config.chromium_path.as_ref()).ok_or_else(|| {
            SessionAcquisitionFailure::new(
                "no Chromium binary found; install Chrome or set RANKINGS_CHROMIUM_PATH",
            )
        })?;
        info!("launching browser {}", executable.display());

        let mut builder = BrowserConfig::builder()
            .chrome_executable(executable)
            .window_size(config.window_width, config.window_height)
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu");
        if !config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder
            .build()
            .map_err(|e| SessionAcquisitionFailure::new(format!("browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionAcquisitionFailure::new(format!("browser launch: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("cdp handler: {e}");
                }
            }
        });

        Ok(Self {
            browser,
            handler: Some(handler),
        })
    }

    /// Close the browser process and stop the event pump.
    pub async fn shutdown(mut self) -> Result<()> {
        let closed = self.browser.close().await;
        let _ = self.browser.wait().await;
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        closed.map(|_| ()).context("closing browser")
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("opening page")?;
        Ok(Box::new(ChromiumContext { page }))
    }
}

/// One browser tab.
pub struct ChromiumContext {
    page: Page,
}

#[async_trait]
impl RenderContext for ChromiumContext {
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult> {
        let start = Instant::now();
        tokio::time::timeout(Duration::from_millis(timeout_ms), self.page.goto(url))
            .await
            .map_err(|_| anyhow!("navigation to {url} timed out after {timeout_ms}ms"))?
            .with_context(|| format!("navigating to {url}"))?;

        let final_url = self.get_url().await.unwrap_or_else(|_| url.to_string());
        Ok(NavigationResult {
            final_url,
            status: 0,
            load_time_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn list_controls(&self, kind: ControlKind) -> Result<Vec<ControlHandle>> {
        match kind {
            ControlKind::Select => {
                let value = self.execute_js(LIST_SELECTS_JS).await?;
                let selects: Vec<SelectInfo> =
                    serde_json::from_value(value).context("decoding select controls")?;
                Ok(selects
                    .into_iter()
                    .map(|s| ControlHandle {
                        index: s.index,
                        id: s.id,
                        options: s.options,
                        selected: s.selected,
                    })
                    .collect())
            }
        }
    }

    async fn select_option_by_visible_text(
        &mut self,
        control: &ControlHandle,
        text: &str,
    ) -> Result<bool> {
        let script = build_select_script(control.index, text)?;
        let result = self.execute_js(&script).await?;
        let selected = result
            .get("selected")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        if !selected {
            warn!(
                control = control.index,
                text, "option not selectable: {}", result
            );
        }
        Ok(selected)
    }

    async fn markup_snapshot(&self) -> Result<String> {
        self.page.content().await.context("reading page content")
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self.page.evaluate(script).await.context("evaluating script")?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.context("closing page")
    }
}

/// Build the in-page script that selects an option by its visible text and
/// fires the events a framework listener would expect.
fn build_select_script(index: usize, text: &str) -> Result<String> {
    let wanted = serde_json::to_string(text)?;
    Ok(format!(
        r#"(() => {{
            const sel = document.querySelectorAll('select')[{index}];
            if (!sel) return {{ found: false, selected: false }};
            const wanted = {wanted};
            const opt = Array.from(sel.options).find(o => (o.text || '').trim() === wanted);
            if (!opt) return {{ found: true, selected: false }};
            sel.value = opt.value;
            opt.selected = true;
            sel.dispatchEvent(new Event('input', {{ bubbles: true }}));
            sel.dispatchEvent(new Event('change', {{ bubbles: true }}));
            return {{ found: true, selected: true }};
        }})()"#
    ))
}
