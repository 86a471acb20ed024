//! Interaction state machine
//!
//! [`Session`] owns all monitor state. Every incoming [`Event`] is handled
//! serially and answered with zero or more [`Effect`]s that the event loop
//! carries out (network fetches, timers, redraws). Nothing here touches the
//! terminal or the network, so transitions are testable in isolation.

use std::time::Duration;

use chrono::{DateTime, Utc};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::error::ScrapeError;
use crate::monitor::history::HistoryStore;
use crate::monitor::parser::Sample;
use crate::monitor::picker::MetricPicker;
use crate::monitor::registry::{batch_matches_metric, SeriesRegistry};
use crate::monitor::render::{chart_dimensions, ChartDims};

/// Terminal rows not available to the series picker list
const SERIES_PICKER_CHROME: u16 = 12;
const SERIES_PICKER_MIN_ROWS: usize = 3;

/// Static settings of a monitor session
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub url: String,
    pub metric: String,
    pub interval: Duration,
    /// Per-series point bound, unbounded when `None`
    pub max_points_per_series: Option<usize>,
    /// Undo visibility toggles when the series picker is cancelled
    pub restore_visibility_on_cancel: bool,
}

/// Input delivered to the session, in arrival order
#[derive(Debug)]
pub enum Event {
    Tick {
        generation: u64,
    },
    SeriesScraped {
        metric: String,
        at: DateTime<Utc>,
        result: Result<Vec<Sample>, ScrapeError>,
    },
    MetricNamesScraped(Result<Vec<String>, ScrapeError>),
    Key(KeyEvent),
    Resize {
        width: u16,
        height: u16,
    },
}

/// Follow-up work requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchSeries(String),
    FetchMetricNames,
    ScheduleTick { generation: u64, after: Duration },
    Redraw,
    RebuildLegend,
    ResizeLegend(usize),
    ScrollLegend(isize),
    Quit,
}

/// Cursor state of the series picker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesCursor {
    pub selected: usize,
    pub scroll: usize,
    snapshot: Vec<bool>,
}

impl SeriesCursor {
    fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            if self.selected < self.scroll {
                self.scroll = self.selected;
            }
        }
    }

    fn move_down(&mut self, len: usize, max_visible: usize) {
        if self.selected + 1 < len {
            self.selected += 1;
            if self.selected >= self.scroll + max_visible {
                self.scroll = self.selected + 1 - max_visible;
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Mode {
    Normal,
    SelectingMetric(MetricPicker),
    SelectingSeries(SeriesCursor),
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::SelectingMetric(_) => "selecting-metric",
            Mode::SelectingSeries(_) => "selecting-series",
        }
    }
}

/// Root state of the monitor, owned by the event loop
#[derive(Debug)]
pub struct Session {
    url: String,
    metric: String,
    interval: Duration,
    restore_visibility_on_cancel: bool,
    registry: SeriesRegistry,
    history: HistoryStore,
    mode: Mode,
    show_legend: bool,
    error: Option<ScrapeError>,
    last_update: Option<DateTime<Utc>>,
    terminal: (u16, u16),
    dims: ChartDims,
    tick_generation: u64,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        Self {
            url: options.url,
            metric: options.metric,
            interval: options.interval,
            restore_visibility_on_cancel: options.restore_visibility_on_cancel,
            registry: SeriesRegistry::new(),
            history: HistoryStore::new(options.max_points_per_series),
            mode: Mode::Normal,
            show_legend: false,
            error: None,
            last_update: None,
            terminal: (0, 0),
            dims: ChartDims::default(),
            tick_generation: 0,
        }
    }

    /// Effects that start the first scrape and tick cycle
    pub fn start(&self) -> Vec<Effect> {
        self.scrape_cycle()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn metric(&self) -> &str {
        &self.metric
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn mode(&self) -> &Mode {
        &self.mode
    }

    pub fn show_legend(&self) -> bool {
        self.show_legend
    }

    pub fn error(&self) -> Option<&ScrapeError> {
        self.error.as_ref()
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn dims(&self) -> ChartDims {
        self.dims
    }

    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal
    }

    /// Rows the series picker can show at once
    pub fn series_picker_rows(&self) -> usize {
        (self.terminal.1.saturating_sub(SERIES_PICKER_CHROME) as usize).max(SERIES_PICKER_MIN_ROWS)
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Tick { generation } => self.on_tick(generation),
            Event::SeriesScraped { metric, at, result } => self.on_series(metric, at, result),
            Event::MetricNamesScraped(result) => self.on_metric_names(result),
            Event::Resize { width, height } => self.on_resize(width, height),
            Event::Key(key) => self.on_key(key),
        }
    }

    fn scrape_cycle(&self) -> Vec<Effect> {
        vec![
            Effect::FetchSeries(self.metric.clone()),
            Effect::ScheduleTick {
                generation: self.tick_generation,
                after: self.interval,
            },
        ]
    }

    fn on_tick(&mut self, generation: u64) -> Vec<Effect> {
        if generation != self.tick_generation {
            debug!(generation, current = self.tick_generation, "Dropping stale tick");
            return Vec::new();
        }
        self.scrape_cycle()
    }

    fn on_series(
        &mut self,
        metric: String,
        at: DateTime<Utc>,
        result: Result<Vec<Sample>, ScrapeError>,
    ) -> Vec<Effect> {
        let samples = match result {
            Ok(samples) => samples,
            Err(e) => {
                if metric != self.metric {
                    debug!(metric = %metric, error = %e, "Ignoring error for abandoned metric");
                    return Vec::new();
                }
                warn!(metric = %metric, error = %e, "Scrape failed, keeping previous data");
                let had_error = self.error.is_some();
                self.error = Some(e);
                return if had_error { Vec::new() } else { self.relayout() };
            }
        };

        if !batch_matches_metric(&samples, &self.metric) {
            debug!(
                current = %self.metric,
                samples = samples.len(),
                "Discarding batch scraped for a different metric"
            );
            return Vec::new();
        }

        let had_error = self.error.take().is_some();
        self.last_update = Some(at);

        let added = self.registry.reconcile(&samples);
        if let Some(range) = self.history.compute_initial_range(&samples) {
            debug!(y_min = range.y_min, y_max = range.y_max, "Display range locked");
        }
        self.history.append_batch(&samples, at);
        debug!(samples = samples.len(), new_series = added, "Accepted scrape");

        let mut effects = if had_error { self.relayout() } else { Vec::new() };
        if !matches!(self.mode, Mode::SelectingSeries(_)) {
            push_unique(&mut effects, Effect::Redraw);
            push_unique(&mut effects, Effect::RebuildLegend);
        }
        effects
    }

    fn on_metric_names(&mut self, result: Result<Vec<String>, ScrapeError>) -> Vec<Effect> {
        let Mode::SelectingMetric(picker) = &mut self.mode else {
            return Vec::new();
        };

        match result {
            Ok(names) => {
                picker.set_items(names);
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Metric discovery failed");
                self.mode = Mode::Normal;
                self.error = Some(e);
                self.relayout()
            }
        }
    }

    fn on_resize(&mut self, width: u16, height: u16) -> Vec<Effect> {
        self.terminal = (width, height);
        self.relayout()
    }

    /// Recompute chart dimensions, signalling a redraw only when they change
    fn relayout(&mut self) -> Vec<Effect> {
        let (width, height) = self.terminal;
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let dims = chart_dimensions(width, height, self.show_legend, self.error.is_some());
        let mut effects = Vec::new();
        if dims != self.dims {
            self.dims = dims;
            effects.push(Effect::Redraw);
        }
        if self.show_legend {
            effects.push(Effect::ResizeLegend(self.dims.legend_rows()));
        }
        effects
    }

    fn on_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }

        match self.mode {
            Mode::Normal => self.on_normal_key(key),
            Mode::SelectingMetric(_) => self.on_metric_picker_key(key),
            Mode::SelectingSeries(_) => self.on_series_picker_key(key),
        }
    }

    fn on_normal_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Char('q') => vec![Effect::Quit],
            KeyCode::Char('m') => {
                self.mode = Mode::SelectingMetric(MetricPicker::loading());
                vec![Effect::FetchMetricNames]
            }
            KeyCode::Char('s') => {
                if !self.history.is_empty() {
                    self.mode = Mode::SelectingSeries(SeriesCursor {
                        snapshot: self.registry.visibility_snapshot(),
                        ..SeriesCursor::default()
                    });
                }
                Vec::new()
            }
            KeyCode::Char('l') => {
                self.show_legend = !self.show_legend;
                let mut effects = vec![Effect::RebuildLegend];
                effects.extend(self.relayout());
                effects
            }
            KeyCode::Char('r') => {
                info!(metric = %self.metric, "Resetting chart");
                self.history.reset();
                vec![Effect::Redraw, Effect::RebuildLegend]
            }
            KeyCode::Up if self.show_legend => vec![Effect::ScrollLegend(-1)],
            KeyCode::Down if self.show_legend => vec![Effect::ScrollLegend(1)],
            _ => Vec::new(),
        }
    }

    fn on_metric_picker_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let Mode::SelectingMetric(picker) = &mut self.mode else {
            return Vec::new();
        };

        if picker.is_filtering() {
            match key.code {
                KeyCode::Esc => picker.reset_filter(),
                KeyCode::Enter => picker.accept_filter(),
                KeyCode::Backspace => picker.pop_filter(),
                KeyCode::Up => picker.move_selection(-1),
                KeyCode::Down => picker.move_selection(1),
                KeyCode::Char(c) => picker.push_filter(c),
                _ => {}
            }
            return Vec::new();
        }

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.mode = Mode::Normal;
                Vec::new()
            }
            KeyCode::Enter => {
                let chosen = picker.selected_item().map(str::to_string);
                self.mode = Mode::Normal;
                match chosen {
                    Some(metric) => self.switch_metric(metric),
                    None => Vec::new(),
                }
            }
            KeyCode::Char('/') => {
                picker.start_filter();
                Vec::new()
            }
            KeyCode::Up | KeyCode::Char('k') => {
                picker.move_selection(-1);
                Vec::new()
            }
            KeyCode::Down | KeyCode::Char('j') => {
                picker.move_selection(1);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    /// Replace the session contents with a fresh one for `metric`
    fn switch_metric(&mut self, metric: String) -> Vec<Effect> {
        info!(from = %self.metric, to = %metric, "Switching metric");
        self.metric = metric;
        self.registry = SeriesRegistry::new();
        self.history.reset();
        self.error = None;
        self.last_update = None;
        self.tick_generation += 1;

        let mut effects = self.scrape_cycle();
        effects.push(Effect::Redraw);
        effects.push(Effect::RebuildLegend);
        effects.extend(self.relayout());
        effects
    }

    fn on_series_picker_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let max_visible = self.series_picker_rows();
        let len = self.registry.len();
        let Mode::SelectingSeries(cursor) = &mut self.mode else {
            return Vec::new();
        };

        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                if self.restore_visibility_on_cancel {
                    self.registry.restore_visibility(&cursor.snapshot);
                }
                self.mode = Mode::Normal;
                Vec::new()
            }
            KeyCode::Enter => {
                self.mode = Mode::Normal;
                vec![Effect::Redraw, Effect::RebuildLegend]
            }
            KeyCode::Char(' ') => {
                self.registry.toggle_at(cursor.selected);
                Vec::new()
            }
            KeyCode::Char('a') => {
                let visible = !self.registry.all_visible();
                self.registry.toggle_all(visible);
                Vec::new()
            }
            KeyCode::Up => {
                cursor.move_up();
                Vec::new()
            }
            KeyCode::Down => {
                cursor.move_down(len, max_visible);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }
}

fn push_unique(effects: &mut Vec<Effect>, effect: Effect) {
    if !effects.contains(&effect) {
        effects.push(effect);
    }
}
