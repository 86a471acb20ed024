//! Render orchestration
//!
//! Decides which series reach the chart surface and the legend, and how
//! large the chart is for a given terminal size.

use ratatui::style::Color;

use crate::monitor::history::{DisplayRange, HistoryStore};
use crate::monitor::legend::LegendLine;
use crate::monitor::parser::label_block_of;
use crate::monitor::registry::{SeriesRecord, SeriesRegistry};

/// Series colors (256-color indices), picked by `color_index % PALETTE.len()`
pub const PALETTE: [Color; 32] = [
    Color::Indexed(202),
    Color::Indexed(46),
    Color::Indexed(226),
    Color::Indexed(201),
    Color::Indexed(51),
    Color::Indexed(208),
    Color::Indexed(99),
    Color::Indexed(171),
    Color::Indexed(196),
    Color::Indexed(33),
    Color::Indexed(214),
    Color::Indexed(40),
    Color::Indexed(129),
    Color::Indexed(39),
    Color::Indexed(160),
    Color::Indexed(45),
    Color::Indexed(220),
    Color::Indexed(135),
    Color::Indexed(118),
    Color::Indexed(200),
    Color::Indexed(81),
    Color::Indexed(227),
    Color::Indexed(161),
    Color::Indexed(48),
    Color::Indexed(57),
    Color::Indexed(190),
    Color::Indexed(213),
    Color::Indexed(38),
    Color::Indexed(154),
    Color::Indexed(124),
    Color::Indexed(27),
    Color::Indexed(141),
];

/// Outer width of the legend box
pub const LEGEND_BOX_WIDTH: u16 = 35;

/// Longest legend label before truncation
const LEGEND_LABEL_MAX: usize = 30;

const ELLIPSIS: &str = "...";

const MIN_CHART_WIDTH: u16 = 40;
const MIN_CHART_HEIGHT: u16 = 10;

pub fn palette_color(color_index: usize) -> Color {
    PALETTE[color_index % PALETTE.len()]
}

/// Points of one series as pushed into the chart surface
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceSeries {
    pub identity: String,
    pub color: Color,
    /// (unix seconds, value)
    pub points: Vec<(f64, f64)>,
}

/// Retained chart contents between redraws
#[derive(Debug, Default)]
pub struct ChartSurface {
    series: Vec<SurfaceSeries>,
    range: Option<DisplayRange>,
}

impl ChartSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.series.clear();
        self.range = None;
    }

    pub fn push(&mut self, series: SurfaceSeries) {
        self.series.push(series);
    }

    /// Rebuild the surface from every visible series with retained points
    pub fn redraw(&mut self, registry: &SeriesRegistry, history: &HistoryStore) {
        self.clear();
        self.range = history.range();

        for record in visible_with_history(registry, history) {
            let Some(points) = history.points(&record.identity) else {
                continue;
            };
            self.push(SurfaceSeries {
                identity: record.identity.clone(),
                color: palette_color(record.color_index),
                points: points
                    .iter()
                    .filter(|p| p.value.is_finite())
                    .map(|p| (unix_seconds(p.timestamp), p.value))
                    .collect(),
            });
        }
    }

    pub fn series(&self) -> &[SurfaceSeries] {
        &self.series
    }

    pub fn range(&self) -> Option<DisplayRange> {
        self.range
    }

    pub fn is_empty(&self) -> bool {
        self.series.iter().all(|s| s.points.is_empty())
    }

    /// Earliest and latest timestamp on the surface
    pub fn x_bounds(&self) -> Option<(f64, f64)> {
        let mut bounds: Option<(f64, f64)> = None;
        for (x, _) in self.series.iter().flat_map(|s| s.points.iter()) {
            bounds = Some(match bounds {
                Some((lo, hi)) => (lo.min(*x), hi.max(*x)),
                None => (*x, *x),
            });
        }
        bounds
    }
}

/// Legend rows for every visible series with retained points
pub fn legend_lines(registry: &SeriesRegistry, history: &HistoryStore) -> Vec<LegendLine> {
    visible_with_history(registry, history)
        .map(|record| LegendLine {
            color: palette_color(record.color_index),
            label: truncate_label(label_block_of(&record.identity)),
        })
        .collect()
}

fn visible_with_history<'a>(
    registry: &'a SeriesRegistry,
    history: &'a HistoryStore,
) -> impl Iterator<Item = &'a SeriesRecord> {
    registry
        .records()
        .iter()
        .filter(move |r| r.visible && history.points(&r.identity).is_some_and(|p| !p.is_empty()))
}

/// Cut a label to the legend width, marking the cut with an ellipsis
pub fn truncate_label(label: &str) -> String {
    if label.chars().count() <= LEGEND_LABEL_MAX {
        return label.to_string();
    }
    let keep = LEGEND_LABEL_MAX - ELLIPSIS.len();
    let mut truncated: String = label.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

fn unix_seconds(timestamp: chrono::DateTime<chrono::Utc>) -> f64 {
    timestamp.timestamp_millis() as f64 / 1000.0
}

/// Chart size inside the terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDims {
    pub width: u16,
    pub height: u16,
}

impl Default for ChartDims {
    fn default() -> Self {
        Self {
            width: 100,
            height: 20,
        }
    }
}

impl ChartDims {
    /// Rows available to legend entries inside the legend box
    pub fn legend_rows(&self) -> usize {
        (self.height as usize).saturating_sub(4).max(1)
    }
}

/// Compute the chart size for a terminal, with minimum floors
pub fn chart_dimensions(
    term_width: u16,
    term_height: u16,
    show_legend: bool,
    has_error: bool,
) -> ChartDims {
    let mut header_footer = 9;
    if has_error {
        header_footer += 2;
    }

    let mut width = term_width.saturating_sub(6);
    if show_legend {
        width = width.saturating_sub(LEGEND_BOX_WIDTH + 3);
    }
    let height = term_height.saturating_sub(header_footer);

    ChartDims {
        width: width.max(MIN_CHART_WIDTH),
        height: height.max(MIN_CHART_HEIGHT),
    }
}
