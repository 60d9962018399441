//! Cascading year → week dropdown navigation.
//!
//! ```text
//! Unloaded ──load──▶ PageLoaded ──year──▶ YearSelected ──week──▶ WeekSelected ──settle──▶ ContentStable
//!                        ▲                                                                   │
//!                        └───────────────────────── any failed transition ◀──────────────────┘
//! ```
//!
//! Week options depend on the selected year, so they are only read once a
//! year selection has settled.

use super::wait::{settle, ContentFingerprint, SettleTarget, WaitConfig};
use crate::error::NavigationError;
use crate::rankings::YearWeekTarget;
use crate::renderer::{ControlHandle, ControlKind, RenderContext};
use std::fmt;
use tracing::{debug, info, warn};

/// Document-order index of the year dropdown.
pub const YEAR_CONTROL: usize = 0;
/// Document-order index of the week dropdown.
pub const WEEK_CONTROL: usize = 1;

/// Where the navigator is in the selection cascade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavState {
    Unloaded,
    PageLoaded,
    YearSelected { year: String },
    WeekSelected { year: String, week: String },
    ContentStable { year: String, week: String },
}

impl NavState {
    /// The year the page is known to show, if any.
    pub fn year(&self) -> Option<&str> {
        match self {
            NavState::YearSelected { year }
            | NavState::WeekSelected { year, .. }
            | NavState::ContentStable { year, .. } => Some(year),
            NavState::Unloaded | NavState::PageLoaded => None,
        }
    }
}

impl fmt::Display for NavState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavState::Unloaded => write!(f, "unloaded"),
            NavState::PageLoaded => write!(f, "page-loaded"),
            NavState::YearSelected { year } => write!(f, "year-selected({year})"),
            NavState::WeekSelected { year, week } => write!(f, "week-selected({year}, {week})"),
            NavState::ContentStable { year, week } => write!(f, "content-stable({year}, {week})"),
        }
    }
}

/// Drives the two dependent dropdowns on one render context.
pub struct DropdownNavigator<'a> {
    ctx: &'a mut dyn RenderContext,
    url: String,
    page_load_timeout_ms: u64,
    wait: WaitConfig,
    state: NavState,
}

impl<'a> DropdownNavigator<'a> {
    pub fn new(
        ctx: &'a mut dyn RenderContext,
        url: impl Into<String>,
        page_load_timeout_ms: u64,
        wait: WaitConfig,
    ) -> Self {
        Self {
            ctx,
            url: url.into(),
            page_load_timeout_ms,
            wait,
            state: NavState::Unloaded,
        }
    }

    pub fn state(&self) -> &NavState {
        &self.state
    }

    fn transition(&mut self, next: NavState) {
        debug!(from = %self.state, to = %next, "navigator transition");
        self.state = next;
    }

    /// Failed transitions fall back to `PageLoaded` once a page is up.
    fn fail(&mut self, err: NavigationError) -> NavigationError {
        if self.state != NavState::Unloaded {
            self.transition(NavState::PageLoaded);
        }
        err
    }

    /// Load (or reload) the rankings page.
    pub async fn load(&mut self) -> Result<(), NavigationError> {
        match self.ctx.navigate(&self.url, self.page_load_timeout_ms).await {
            Ok(nav) => {
                info!(url = %nav.final_url, load_ms = nav.load_time_ms, "rankings page loaded");
                self.transition(NavState::PageLoaded);
                Ok(())
            }
            Err(e) => {
                self.transition(NavState::Unloaded);
                Err(NavigationError::PageLoad(format!("{e:#}")))
            }
        }
    }

    async fn control(&self, index: usize) -> Result<ControlHandle, NavigationError> {
        let controls = self
            .ctx
            .list_controls(ControlKind::Select)
            .await
            .map_err(|e| NavigationError::Renderer(format!("{e:#}")))?;
        controls
            .into_iter()
            .find(|c| c.index == index)
            .ok_or(NavigationError::ControlMissing(index))
    }

    /// Year options as presented, trimmed and non-empty.
    pub async fn discover_years(&mut self) -> Result<Vec<String>, NavigationError> {
        if self.state == NavState::Unloaded {
            return Err(NavigationError::PageLoad("page not loaded".to_string()));
        }
        let control = self.control(YEAR_CONTROL).await?;
        Ok(clean_options(control.options))
    }

    /// Week options for the currently selected year.
    pub async fn discover_weeks(&mut self) -> Result<Vec<String>, NavigationError> {
        if self.state.year().is_none() {
            return Err(NavigationError::YearNotSelected);
        }
        let control = self.control(WEEK_CONTROL).await?;
        Ok(clean_options(control.options))
    }

    /// Select `year` and wait for the page to settle.
    pub async fn select_year(&mut self, year: &str) -> Result<(), NavigationError> {
        if self.state == NavState::Unloaded {
            return Err(NavigationError::PageLoad("page not loaded".to_string()));
        }
        match self.select_and_settle(YEAR_CONTROL, year).await {
            Ok(()) => {
                self.transition(NavState::YearSelected {
                    year: year.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn select_week(&mut self, year: &str, week: &str) -> Result<(), NavigationError> {
        match self.select_and_settle(WEEK_CONTROL, week).await {
            Ok(()) => {
                self.transition(NavState::WeekSelected {
                    year: year.to_string(),
                    week: week.to_string(),
                });
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn select_and_settle(&mut self, index: usize, text: &str) -> Result<(), NavigationError> {
        let control = self.control(index).await?;
        if !control.has_option(text) {
            return Err(NavigationError::OptionMissing {
                control: index,
                text: text.to_string(),
            });
        }
        let already_selected = control.selected.as_deref() == Some(text);
        let baseline = ContentFingerprint::capture(&*self.ctx).await?;

        let selected = self
            .ctx
            .select_option_by_visible_text(&control, text)
            .await
            .map_err(|e| NavigationError::Renderer(format!("{e:#}")))?;
        if !selected {
            return Err(NavigationError::OptionMissing {
                control: index,
                text: text.to_string(),
            });
        }

        settle(
            &*self.ctx,
            self.wait,
            SettleTarget {
                control: index,
                expected: text,
                baseline,
                expect_change: !already_selected,
            },
        )
        .await?;
        Ok(())
    }

    /// Select the target's year (when not already showing) then its week.
    pub async fn try_select_target(&mut self, target: &YearWeekTarget) -> Result<(), NavigationError> {
        if self.state == NavState::Unloaded {
            return Err(NavigationError::PageLoad("page not loaded".to_string()));
        }
        if self.state.year() != Some(target.year.as_str()) {
            self.select_year(&target.year).await?;
        }
        self.select_week(&target.year, &target.week).await?;
        self.transition(NavState::ContentStable {
            year: target.year.clone(),
            week: target.week.clone(),
        });
        Ok(())
    }

    /// Like [`Self::try_select_target`] but reports failure as `false` so the
    /// caller can skip the unit and move on.
    pub async fn select_target(&mut self, target: &YearWeekTarget) -> bool {
        match self.try_select_target(target).await {
            Ok(()) => true,
            Err(e) => {
                warn!(year = %target.year, week = %target.week, "selection failed: {e}");
                false
            }
        }
    }

    /// Markup of the page as currently rendered.
    pub async fn snapshot(&self) -> Result<String, NavigationError> {
        self.ctx
            .markup_snapshot()
            .await
            .map_err(|e| NavigationError::Renderer(format!("{e:#}")))
    }
}

fn clean_options(options: Vec<String>) -> Vec<String> {
    options
        .into_iter()
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}
