//! Terminal UI for the metric monitor
//!
//! Draws the session with ratatui: header, error line, chart with optional
//! legend, the two pickers and the help bar.

use chrono::{DateTime, Local, TimeZone, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, BorderType, Borders, Chart, Dataset, GraphType, List, ListItem, ListState, Paragraph},
    Frame,
};

use crate::error::ScrapeErrorKind;
use crate::monitor::app::{Mode, SeriesCursor, Session};
use crate::monitor::legend::LegendViewport;
use crate::monitor::picker::MetricPicker;
use crate::monitor::render::{ChartSurface, LEGEND_BOX_WIDTH};

const ACCENT: Color = Color::Indexed(202);
const AXIS: Color = Color::Indexed(245);
const LABEL: Color = Color::Indexed(15);
const ERROR: Color = Color::Indexed(196);

/// Draw the whole screen for the current session
pub fn render(f: &mut Frame, session: &Session, surface: &ChartSurface, legend: &LegendViewport) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Body
            Constraint::Length(1), // Help bar
        ])
        .split(f.area());

    render_header(f, session, chunks[0]);

    match session.mode() {
        Mode::SelectingMetric(picker) => {
            render_metric_picker(f, picker, chunks[1]);
            render_help(f, "Enter: Select | Esc/q: Cancel | /: Filter | ↑↓: Navigate", chunks[2]);
        }
        Mode::SelectingSeries(cursor) => {
            render_series_picker(f, session, cursor, chunks[1]);
            render_help(
                f,
                "Space: Toggle | Enter: Accept | a: Toggle All | Esc/q: Cancel | ↑↓: Navigate",
                chunks[2],
            );
        }
        Mode::Normal => {
            render_body(f, session, surface, legend, chunks[1]);
            render_key_bar(f, session, legend, chunks[2]);
        }
    }
}

fn render_header(f: &mut Frame, session: &Session, area: Rect) {
    let last_update = session
        .last_update()
        .map(|t| t.with_timezone(&Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "Never".to_string());

    let lines = vec![
        Line::from(vec![
            Span::styled(
                format!("Metric: {}", session.metric()),
                Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
            ),
            Span::raw("  |  Last update: "),
            Span::styled(last_update, Style::default().fg(Color::Green)),
        ]),
        Line::from(Span::styled(
            format!(
                "URL: {} | Interval: {:.1}s",
                session.url(),
                session.interval().as_secs_f64()
            ),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let paragraph = Paragraph::new(lines).block(Block::default().borders(Borders::BOTTOM));
    f.render_widget(paragraph, area);
}

fn render_body(
    f: &mut Frame,
    session: &Session,
    surface: &ChartSurface,
    legend: &LegendViewport,
    area: Rect,
) {
    let mut area = area;

    if let Some(error) = session.error() {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(2), Constraint::Min(1)])
            .split(area);
        let prefix = match error.kind() {
            ScrapeErrorKind::Endpoint => "Endpoint error",
            ScrapeErrorKind::MetricNotFound => "Metric not found",
        };
        let content = vec![
            Line::from(Span::styled(
                format!("⚠  {}: {}", prefix, error),
                Style::default().fg(ERROR),
            )),
            Line::from(Span::styled(
                "(retrying on next interval...)",
                Style::default().fg(Color::Yellow),
            )),
        ];
        f.render_widget(Paragraph::new(content), rows[0]);
        area = rows[1];
    }

    let dims = session.dims();
    let show_legend = session.show_legend() && !session.registry().is_empty();
    let mut constraints = vec![Constraint::Length(dims.width.saturating_add(2))];
    if show_legend {
        constraints.push(Constraint::Length(1));
        constraints.push(Constraint::Length(LEGEND_BOX_WIDTH));
    }
    constraints.push(Constraint::Min(0));

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(constraints)
        .split(area);

    let chart_area = Rect {
        height: columns[0].height.min(dims.height.saturating_add(2)),
        ..columns[0]
    };
    render_chart(f, surface, chart_area);

    if show_legend {
        let legend_area = Rect {
            height: chart_area.height,
            ..columns[2]
        };
        render_legend(f, legend, legend_area);
    }
}

fn render_chart(f: &mut Frame, surface: &ChartSurface, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(ACCENT));

    if surface.is_empty() {
        let waiting = Paragraph::new(Line::from(Span::styled(
            "Waiting for metrics data...",
            Style::default().fg(Color::Yellow),
        )))
        .block(block);
        f.render_widget(waiting, area);
        return;
    }

    let (x_min, mut x_max) = surface.x_bounds().unwrap_or((0.0, 1.0));
    if x_max <= x_min {
        x_max = x_min + 1.0;
    }
    let (y_min, y_max) = surface
        .range()
        .map(|r| (r.y_min, r.y_max))
        .unwrap_or((-1.0, 1.0));

    let datasets: Vec<Dataset> = surface
        .series()
        .iter()
        .map(|series| {
            Dataset::default()
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(series.color))
                .data(&series.points)
        })
        .collect();

    let label_style = Style::default().fg(LABEL);
    let chart = Chart::new(datasets)
        .block(block)
        .x_axis(
            Axis::default()
                .style(Style::default().fg(AXIS))
                .bounds([x_min, x_max])
                .labels(vec![
                    Span::styled(format_x_label(x_min), label_style),
                    Span::styled(format_x_label(x_max), label_style),
                ]),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(AXIS))
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format_y_label(y_min), label_style),
                    Span::styled(format_y_label((y_min + y_max) / 2.0), label_style),
                    Span::styled(format_y_label(y_max), label_style),
                ]),
        );

    f.render_widget(chart, area);
}

fn render_legend(f: &mut Frame, legend: &LegendViewport, area: Rect) {
    let mut lines = vec![
        Line::from(Span::styled(
            "Legend",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];
    lines.extend(legend.visible_lines().iter().map(|entry| {
        Line::from(vec![
            Span::styled("■", Style::default().fg(entry.color)),
            Span::raw(" "),
            Span::raw(entry.label.clone()),
        ])
    }));

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(ACCENT)),
    );
    f.render_widget(paragraph, area);
}

fn render_metric_picker(f: &mut Frame, picker: &MetricPicker, area: Rect) {
    let title = if picker.is_loading() {
        "Select a metric: (loading...)".to_string()
    } else if picker.is_filtering() || !picker.filter().is_empty() {
        format!("Select a metric: /{}", picker.filter())
    } else {
        "Select a metric:".to_string()
    };

    let items: Vec<ListItem> = picker
        .visible_items()
        .enumerate()
        .map(|(idx, name)| ListItem::new(format!("{}. {}", idx + 1, name)))
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .title(Span::styled(
                    title,
                    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
                ))
                .borders(Borders::NONE),
        )
        .highlight_style(Style::default().fg(ACCENT))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(Some(picker.selected()));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_series_picker(f: &mut Frame, session: &Session, cursor: &SeriesCursor, area: Rect) {
    let records = session.registry().records();
    let start = cursor.scroll.min(records.len());
    let end = (start + session.series_picker_rows()).min(records.len());

    let mut lines = vec![
        Line::from(Span::styled(
            "Select Series to Display:",
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
    ];

    for (idx, record) in records.iter().enumerate().take(end).skip(start) {
        let marker = if idx == cursor.selected { ">" } else { " " };
        let check = if record.visible { "✓" } else { " " };
        let text = format!("{} [{}] {}", marker, check, record.identity);
        let style = if idx == cursor.selected {
            Style::default().fg(ACCENT)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(format!("  {}", text), style)));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn render_key_bar(f: &mut Frame, session: &Session, legend: &LegendViewport, area: Rect) {
    let key_style = Style::default()
        .bg(Color::Indexed(237))
        .fg(Color::Indexed(15))
        .add_modifier(Modifier::BOLD);
    let value_style = Style::default().bg(Color::Indexed(15)).fg(Color::Indexed(0));

    let mut keys = vec![("q", "Quit"), ("m", "Metrics"), ("s", "Series"), ("l", "Legend"), ("r", "Reset")];
    if session.show_legend() && legend.can_scroll() {
        keys.push(("↑↓", "Scroll"));
    }

    let mut spans = Vec::new();
    for (idx, (key, label)) in keys.into_iter().enumerate() {
        if idx > 0 {
            spans.push(Span::styled("  ", value_style));
        }
        spans.push(Span::styled(key, key_style));
        spans.push(Span::styled(label, value_style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)).style(value_style), area);
}

fn render_help(f: &mut Frame, text: &str, area: Rect) {
    let style = Style::default().bg(Color::Indexed(0)).fg(Color::Indexed(15));
    f.render_widget(Paragraph::new(text.to_string()).style(style), area);
}

/// Format a Y-axis value, keeping at least two decimals for small values
pub fn format_y_label(value: f64) -> String {
    if value == 0.0 {
        return "0.00".to_string();
    }
    let magnitude = value.abs();
    if magnitude < 100.0 {
        format!("{:.2}", value)
    } else if magnitude < 1000.0 {
        format!("{:.1}", value)
    } else {
        format!("{:.0}", value)
    }
}

/// Format an X-axis position (unix seconds) as local wall-clock time
pub fn format_x_label(unix_seconds: f64) -> String {
    let millis = (unix_seconds * 1000.0).round() as i64;
    match Utc.timestamp_millis_opt(millis).single() {
        Some(t) => DateTime::<Local>::from(t).format("%H:%M:%S").to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::app::{Event, SessionOptions};
    use crate::monitor::parser::Sample;
    use crate::monitor::render::legend_lines;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::time::Duration;

    #[test]
    fn test_format_y_label() {
        assert_eq!(format_y_label(0.0), "0.00");
        assert_eq!(format_y_label(0.456), "0.46");
        assert_eq!(format_y_label(42.1234), "42.12");
        assert_eq!(format_y_label(512.5), "512.5");
        assert_eq!(format_y_label(5120.0), "5120");
        assert_eq!(format_y_label(-0.3), "-0.30");
        assert_eq!(format_y_label(-123.45), "-123.5");
    }

    #[test]
    fn test_format_x_label_shape() {
        let label = format_x_label(1_700_000_000.0);
        assert_eq!(label.len(), 8);
        assert_eq!(label.matches(':').count(), 2);
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    fn populated_session() -> Session {
        let mut session = Session::new(SessionOptions {
            url: "http://localhost:9100/metrics".to_string(),
            metric: "up".to_string(),
            interval: Duration::from_secs(2),
            max_points_per_series: None,
            restore_visibility_on_cancel: false,
        });
        session.handle(Event::Resize {
            width: 120,
            height: 40,
        });
        for secs in 0..3 {
            session.handle(Event::SeriesScraped {
                metric: "up".to_string(),
                at: Utc.timestamp_opt(1_700_000_000 + secs * 2, 0).unwrap(),
                result: Ok(vec![
                    Sample {
                        identity: "up{job=\"node\"}".to_string(),
                        value: 1.0 + secs as f64,
                    },
                    Sample {
                        identity: "up{}".to_string(),
                        value: 0.5,
                    },
                ]),
            });
        }
        session
    }

    #[test]
    fn test_render_normal_mode() {
        let mut session = populated_session();
        session.handle(Event::Key(KeyEvent::new(KeyCode::Char('l'), KeyModifiers::NONE)));

        let mut surface = ChartSurface::new();
        surface.redraw(session.registry(), session.history());
        let mut legend = LegendViewport::new(session.dims().legend_rows());
        legend.set_content(legend_lines(session.registry(), session.history()));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|f| render(f, &session, &surface, &legend))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Metric: up"));
        assert!(text.contains("Legend"));
        assert!(text.contains("{job=\"node\"}"));
        assert!(text.contains("Quit"));
    }

    #[test]
    fn test_render_series_picker() {
        let mut session = populated_session();
        session.handle(Event::Key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE)));
        session.handle(Event::Key(KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE)));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|f| render(f, &session, &ChartSurface::new(), &LegendViewport::new(1)))
            .unwrap();

        let text = screen_text(&terminal);
        assert!(text.contains("Select Series to Display:"));
        assert!(text.contains("> [ ] up{job=\"node\"}"));
        assert!(text.contains("[✓] up{}"));
    }

    #[test]
    fn test_render_metric_picker_and_error() {
        let mut session = populated_session();
        session.handle(Event::Key(KeyEvent::new(KeyCode::Char('m'), KeyModifiers::NONE)));
        session.handle(Event::MetricNamesScraped(Ok(vec![
            "go_goroutines".to_string(),
            "up".to_string(),
        ])));

        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal
            .draw(|f| render(f, &session, &ChartSurface::new(), &LegendViewport::new(1)))
            .unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Select a metric:"));
        assert!(text.contains("2. up"));

        session.handle(Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        session.handle(Event::SeriesScraped {
            metric: "up".to_string(),
            at: Utc::now(),
            result: Err(crate::error::ScrapeError::Status(503)),
        });
        terminal
            .draw(|f| render(f, &session, &ChartSurface::new(), &LegendViewport::new(1)))
            .unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Endpoint error: unexpected status code: 503"));
        assert!(text.contains("Waiting for metrics data..."));
    }
}
