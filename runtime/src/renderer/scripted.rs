//! In-memory page that behaves like the live rankings site.
//!
//! The week dropdown's options depend on the selected year, selecting a year
//! resets the week to its first option, and freshly selected content only
//! shows up in the markup after a configurable number of snapshot polls.

use super::{ControlHandle, ControlKind, NavigationResult, RenderContext, Renderer};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

type MarkupFn = Arc<dyn Fn(&str, &str) -> String + Send + Sync>;

/// Static description of a site.
#[derive(Clone)]
pub(crate) struct ScriptedSite {
    /// Years in dropdown order, each with its week labels.
    pub years: Vec<(String, Vec<String>)>,
    /// Pairs whose week option refuses to be selected.
    pub unselectable: HashSet<(String, String)>,
    /// Pairs whose selection "succeeds" but is never reflected by the page.
    pub unresponsive: HashSet<(String, String)>,
    /// Years for which the page renders no week dropdown.
    pub missing_week_control: HashSet<String>,
    /// Snapshot polls before new content replaces the old.
    pub latency_polls: u32,
    pub fail_load: bool,
    pub markup: MarkupFn,
}

impl ScriptedSite {
    /// Three seasons shaped like the real site: a preseason week with no
    /// table, a few committee weeks, and a final ranking.
    pub fn cfp_like() -> Self {
        let mut years = Vec::new();
        for year in ["2023", "2022", "2021"] {
            years.push((
                year.to_string(),
                vec![
                    "Preseason".to_string(),
                    "Week 5".to_string(),
                    "Week 6".to_string(),
                    "Final".to_string(),
                ],
            ));
        }
        Self {
            years,
            unselectable: HashSet::new(),
            unresponsive: HashSet::new(),
            missing_week_control: HashSet::new(),
            latency_polls: 2,
            fail_load: false,
            markup: Arc::new(|year, week| ranking_markup(year, week)),
        }
    }

    fn weeks(&self, year: &str) -> Vec<String> {
        self.years
            .iter()
            .find(|(y, _)| y == year)
            .map(|(_, w)| w.clone())
            .unwrap_or_default()
    }
}

/// Deterministic ranking table for a year/week; preseason has none.
pub(crate) fn ranking_markup(year: &str, week: &str) -> String {
    if week == "Preseason" {
        return format!(
            "<html><body><h1>{year} {week}</h1><p>Rankings not yet released.</p></body></html>"
        );
    }
    let offset: usize = week
        .trim_start_matches("Week ")
        .parse()
        .unwrap_or(9);
    let teams = [
        "Georgia Bulldogs",
        "Michigan Wolverines",
        "Ohio State Buckeyes",
        "Alabama Crimson Tide",
        "Texas Longhorns",
    ];
    let mut rows = String::from("<tr><th>Rank</th><th>Team</th><th>Record</th></tr>");
    for i in 0..teams.len() {
        let team = teams[(i + offset) % teams.len()];
        rows.push_str(&format!(
            "<tr><td>{}</td><td><img alt=\"logo\"> {team}</td><td>{}-{}</td></tr>",
            i + 1,
            10 - i,
            i + 1
        ));
    }
    format!(
        "<html><body><table class=\"rankings\"><caption>{year} {week}</caption>{rows}</table></body></html>"
    )
}

#[derive(Default)]
struct PageState {
    loaded: bool,
    year: Option<String>,
    week: Option<String>,
    /// What the markup currently shows.
    rendered: Option<(String, String)>,
    pending_polls: u32,
}

/// A page of a [`ScriptedSite`].
pub(crate) struct ScriptedPage {
    site: ScriptedSite,
    state: Mutex<PageState>,
    closed: Arc<AtomicBool>,
    /// Every successful selection, in order.
    pub selections: Arc<Mutex<Vec<(usize, String)>>>,
}

impl ScriptedPage {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site,
            state: Mutex::new(PageState::default()),
            closed: Arc::new(AtomicBool::new(false)),
            selections: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    fn reset_to_year(&self, state: &mut PageState, year: &str) {
        state.year = Some(year.to_string());
        state.week = self.site.weeks(year).into_iter().next();
        state.pending_polls = self.site.latency_polls;
    }
}

#[async_trait]
impl RenderContext for ScriptedPage {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        if self.site.fail_load {
            bail!("connection refused: {url}");
        }
        let mut state = self.state.lock().unwrap();
        *state = PageState::default();
        state.loaded = true;
        if let Some((year, _)) = self.site.years.first().cloned() {
            self.reset_to_year(&mut state, &year);
            state.pending_polls = 0;
            state.rendered = Some((year, state.week.clone().unwrap_or_default()));
        }
        Ok(NavigationResult {
            final_url: url.to_string(),
            status: 200,
            load_time_ms: 1,
        })
    }

    async fn list_controls(&self, kind: ControlKind) -> Result<Vec<ControlHandle>> {
        assert_eq!(kind, ControlKind::Select);
        let state = self.state.lock().unwrap();
        if !state.loaded {
            return Ok(Vec::new());
        }
        let mut controls = vec![ControlHandle {
            index: 0,
            id: Some("ddl_year".to_string()),
            options: self.site.years.iter().map(|(y, _)| y.clone()).collect(),
            selected: state.year.clone(),
        }];
        let year = state.year.clone().unwrap_or_default();
        if !self.site.missing_week_control.contains(&year) {
            controls.push(ControlHandle {
                index: 1,
                id: Some("ddl_week".to_string()),
                options: self.site.weeks(&year),
                selected: state.week.clone(),
            });
        }
        Ok(controls)
    }

    async fn select_option_by_visible_text(
        &mut self,
        control: &ControlHandle,
        text: &str,
    ) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        match control.index {
            0 => {
                if !self.site.years.iter().any(|(y, _)| y == text) {
                    return Ok(false);
                }
                self.reset_to_year(&mut state, text);
            }
            1 => {
                let year = state.year.clone().unwrap_or_default();
                if self.site.missing_week_control.contains(&year)
                    || !self.site.weeks(&year).iter().any(|w| w == text)
                {
                    return Ok(false);
                }
                let pair = (year, text.to_string());
                if self.site.unselectable.contains(&pair) {
                    return Ok(false);
                }
                if !self.site.unresponsive.contains(&pair) {
                    state.week = Some(text.to_string());
                    state.pending_polls = self.site.latency_polls;
                }
            }
            _ => return Ok(false),
        }
        self.selections
            .lock()
            .unwrap()
            .push((control.index, text.to_string()));
        Ok(true)
    }

    async fn markup_snapshot(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if !state.loaded {
            return Ok(String::new());
        }
        if state.pending_polls > 0 {
            state.pending_polls -= 1;
        } else if let (Some(y), Some(w)) = (state.year.clone(), state.week.clone()) {
            state.rendered = Some((y, w));
        }
        Ok(match &state.rendered {
            Some((y, w)) => (self.site.markup)(y, w),
            None => "<html><body></body></html>".to_string(),
        })
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn get_url(&self) -> Result<String> {
        Ok("scripted://rankings".to_string())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Renderer handing out pages of one site; records how many were opened.
pub(crate) struct ScriptedRenderer {
    pub site: ScriptedSite,
    pub fail_acquire: bool,
    pub opened: Mutex<Vec<Arc<AtomicBool>>>,
}

impl ScriptedRenderer {
    pub fn new(site: ScriptedSite) -> Self {
        Self {
            site,
            fail_acquire: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    /// True when every page handed out has been closed.
    pub fn all_closed(&self) -> bool {
        self.opened
            .lock()
            .unwrap()
            .iter()
            .all(|flag| flag.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        if self.fail_acquire {
            bail!("browser binary crashed on startup");
        }
        let page = ScriptedPage::new(self.site.clone());
        self.opened.lock().unwrap().push(page.closed_flag());
        Ok(Box::new(page))
    }
}
