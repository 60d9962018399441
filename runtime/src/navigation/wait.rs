//! Condition-based settle waits.
//!
//! After a selection the page re-renders asynchronously. Rather than sleep
//! for a guessed duration, poll the page until the selection shows, the
//! ranking region has changed (when a change is expected) and two
//! consecutive polls agree.

use crate::error::NavigationError;
use crate::extraction::table::element_text;
use crate::renderer::{ControlKind, RenderContext};
use scraper::{Html, Selector};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

static TABLE_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

/// Polling parameters for a settle wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitConfig {
    pub timeout: Duration,
    pub poll_interval: Duration,
    /// Extra pause after a successful wait. Zero disables it.
    pub floor: Duration,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            floor: Duration::ZERO,
        }
    }
}

/// The wait ran out of time.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("condition not met within {waited:?}")]
pub struct WaitTimeout {
    pub waited: Duration,
}

/// Bounded polling clock.
pub struct Deadline {
    started: Instant,
    config: WaitConfig,
}

impl Deadline {
    pub fn start(config: WaitConfig) -> Self {
        Self {
            started: Instant::now(),
            config,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn expired(&self) -> bool {
        self.elapsed() >= self.config.timeout
    }

    /// Sleep one poll interval, or fail if the deadline has passed.
    pub async fn tick(&self) -> Result<(), WaitTimeout> {
        if self.expired() {
            return Err(WaitTimeout {
                waited: self.elapsed(),
            });
        }
        let remaining = self.config.timeout.saturating_sub(self.elapsed());
        tokio::time::sleep(self.config.poll_interval.min(remaining)).await;
        Ok(())
    }
}

/// Stable hash of the ranking region of a document (every `<table>`'s text).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFingerprint(pub u64);

impl ContentFingerprint {
    pub fn of_markup(markup: &str) -> Self {
        let document = Html::parse_document(markup);
        let mut hasher = DefaultHasher::new();
        let mut tables = 0usize;
        for table in document.select(&TABLE_SEL) {
            element_text(table).hash(&mut hasher);
            tables += 1;
        }
        tables.hash(&mut hasher);
        Self(hasher.finish())
    }

    /// Fingerprint the page as it is right now.
    pub async fn capture(ctx: &dyn RenderContext) -> Result<Self, NavigationError> {
        let markup = ctx
            .markup_snapshot()
            .await
            .map_err(|e| NavigationError::Renderer(format!("{e:#}")))?;
        Ok(Self::of_markup(&markup))
    }
}

/// What the page should look like once a selection has taken effect.
#[derive(Debug, Clone)]
pub struct SettleTarget<'a> {
    /// Index of the select control that was changed.
    pub control: usize,
    /// Option text that should now be selected.
    pub expected: &'a str,
    /// Fingerprint taken just before the selection.
    pub baseline: ContentFingerprint,
    /// Whether the ranking region must differ from `baseline`.
    pub expect_change: bool,
}

/// Poll until the page reflects `target` and its content is stable.
///
/// If the selection shows and the content is stable but never differs from
/// the baseline, the wait still succeeds when the deadline passes: two weeks
/// may legitimately render identical content (two empty weeks in a row).
/// Only a selection that never shows, or content that never stops changing,
/// is a timeout.
pub async fn settle(
    ctx: &dyn RenderContext,
    config: WaitConfig,
    target: SettleTarget<'_>,
) -> Result<Duration, NavigationError> {
    let deadline = Deadline::start(config);
    let mut previous: Option<ContentFingerprint> = None;
    let mut stable_unchanged = false;

    loop {
        let (reflected, current) = match observe(ctx, &target).await {
            Ok(observed) => observed,
            Err(e) => {
                debug!(control = target.control, cause = %e, "page not readable yet");
                previous = None;
                stable_unchanged = false;
                if deadline.tick().await.is_err() {
                    return Err(NavigationError::SettleTimeout(config.timeout));
                }
                continue;
            }
        };
        let stable = previous == Some(current);
        let changed = current != target.baseline;
        previous = Some(current);

        if reflected && stable {
            if changed || !target.expect_change {
                let waited = deadline.elapsed();
                debug!(control = target.control, expected = target.expected, ?waited, "settled");
                if !config.floor.is_zero() {
                    tokio::time::sleep(config.floor).await;
                }
                return Ok(waited);
            }
            stable_unchanged = true;
        } else {
            stable_unchanged = false;
        }

        if deadline.tick().await.is_err() {
            if stable_unchanged {
                warn!(
                    control = target.control,
                    expected = target.expected,
                    "content unchanged after selection, accepting as settled"
                );
                return Ok(deadline.elapsed());
            }
            return Err(NavigationError::SettleTimeout(config.timeout));
        }
    }
}

/// One poll: is the selection reflected, and what does the content look like.
/// Errors here are usually a page mid re-render; `settle` retries them.
async fn observe(
    ctx: &dyn RenderContext,
    target: &SettleTarget<'_>,
) -> Result<(bool, ContentFingerprint), NavigationError> {
    let controls = ctx
        .list_controls(ControlKind::Select)
        .await
        .map_err(|e| NavigationError::Renderer(format!("{e:#}")))?;
    let reflected = controls
        .get(target.control)
        .and_then(|c| c.selected.as_deref())
        .is_some_and(|s| s == target.expected);
    let current = ContentFingerprint::capture(ctx).await?;
    Ok((reflected, current))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::scripted::ranking_markup;

    #[test]
    fn test_fingerprint_tracks_table_region_only() {
        let a = ContentFingerprint::of_markup(&ranking_markup("2023", "Week 5"));
        let b = ContentFingerprint::of_markup(&ranking_markup("2023", "Week 6"));
        assert_ne!(a, b);

        let with_banner = ranking_markup("2023", "Week 5")
            .replace("<body>", "<body><div class=\"ad\">Rotating banner 42</div>");
        assert_eq!(a, ContentFingerprint::of_markup(&with_banner));
    }

    #[test]
    fn test_fingerprint_distinguishes_no_tables() {
        let empty = ContentFingerprint::of_markup("<p>none</p>");
        let one = ContentFingerprint::of_markup("<table></table>");
        assert_ne!(empty, one);
    }

    #[tokio::test]
    async fn test_deadline_expires() {
        let deadline = Deadline::start(WaitConfig {
            timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
            floor: Duration::ZERO,
        });
        let mut ticks = 0;
        while deadline.tick().await.is_ok() {
            ticks += 1;
            assert!(ticks < 1000);
        }
        assert!(deadline.expired());
        assert!(ticks >= 1);
    }
}
