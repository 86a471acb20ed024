//! Watch command implementation
//!
//! Runs the interactive monitor: one serial event loop owns the session,
//! scrapes run as detached tasks and report back through the same queue.

use anyhow::Result;
use crossterm::{
    event::{self, Event as TermEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::{sync::mpsc::UnboundedSender, task::JoinHandle};
use tracing::{info, warn};

use metric_scope::{
    config::MonitorConfig,
    monitor::{
        legend::LegendViewport,
        render::{legend_lines, ChartSurface},
        ui, Effect, Event, MetricsFetcher, Session, SessionOptions,
    },
};

/// How long the input reader waits for a terminal event before re-checking shutdown
const INPUT_POLL: Duration = Duration::from_millis(50);

/// Execute the watch command
pub async fn execute(cfg: MonitorConfig) -> Result<()> {
    let fetcher = MetricsFetcher::new(cfg.endpoint().to_string());

    // 1. Pick the metric to start with
    let metric = resolve_metric(&fetcher, cfg.metric.clone()).await?;
    info!(url = %fetcher.url(), metric = %metric, "Starting monitor");

    // 2. Run dashboard
    let options = SessionOptions {
        url: fetcher.url().to_string(),
        metric,
        interval: cfg.interval(),
        max_points_per_series: cfg.max_points_per_series,
        restore_visibility_on_cancel: cfg.restore_visibility_on_cancel,
    };
    run_dashboard(options, fetcher).await
}

/// Use the configured metric, or the first one the endpoint exposes
async fn resolve_metric(fetcher: &MetricsFetcher, metric: Option<String>) -> Result<String> {
    if let Some(metric) = metric {
        return Ok(metric);
    }

    let names = fetcher
        .discover_metrics()
        .await
        .map_err(|e| anyhow::anyhow!("Error fetching metrics: {}", e))?;

    names
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("No metrics found at the endpoint"))
}

/// Run the monitor dashboard
async fn run_dashboard(options: SessionOptions, fetcher: MetricsFetcher) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Clear screen on startup
    terminal.clear()?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = Arc::new(AtomicBool::new(false));
    let input_reader = spawn_input_reader(tx.clone(), shutdown.clone());

    // Initialize state
    let mut session = Session::new(options);
    let mut surface = ChartSurface::new();
    let mut legend = LegendViewport::new(session.dims().legend_rows());

    let mut pending = session.start();
    let size = terminal.size()?;
    pending.extend(session.handle(Event::Resize {
        width: size.width,
        height: size.height,
    }));

    // Main loop
    let result = loop {
        let quit = apply_effects(
            std::mem::take(&mut pending),
            &session,
            &mut surface,
            &mut legend,
            &fetcher,
            &tx,
        );
        if quit {
            break Ok(());
        }

        // Render UI
        if let Err(e) = terminal.draw(|f| ui::render(f, &session, &surface, &legend)) {
            break Err(e.into());
        }

        match rx.recv().await {
            Some(event) => pending = session.handle(event),
            None => break Ok(()),
        }
    };

    // Restore terminal
    shutdown.store(true, Ordering::Relaxed);
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    if let Err(e) = input_reader.await {
        warn!(error = %e, "Input reader did not shut down cleanly");
    }

    result
}

/// Carry out the effects of one transition; returns true on quit
fn apply_effects(
    effects: Vec<Effect>,
    session: &Session,
    surface: &mut ChartSurface,
    legend: &mut LegendViewport,
    fetcher: &MetricsFetcher,
    tx: &UnboundedSender<Event>,
) -> bool {
    for effect in effects {
        match effect {
            Effect::FetchSeries(metric) => spawn_series_fetch(fetcher.clone(), metric, tx.clone()),
            Effect::FetchMetricNames => spawn_discovery(fetcher.clone(), tx.clone()),
            Effect::ScheduleTick { generation, after } => {
                let tx = tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(Event::Tick { generation });
                });
            }
            Effect::Redraw => surface.redraw(session.registry(), session.history()),
            Effect::RebuildLegend => {
                legend.set_content(legend_lines(session.registry(), session.history()))
            }
            Effect::ResizeLegend(rows) => legend.set_height(rows),
            Effect::ScrollLegend(delta) => legend.scroll_by(delta),
            Effect::Quit => return true,
        }
    }
    false
}

fn spawn_series_fetch(fetcher: MetricsFetcher, metric: String, tx: UnboundedSender<Event>) {
    tokio::spawn(async move {
        let result = fetcher.fetch_series(&metric).await;
        let _ = tx.send(Event::SeriesScraped {
            metric,
            at: chrono::Utc::now(),
            result,
        });
    });
}

fn spawn_discovery(fetcher: MetricsFetcher, tx: UnboundedSender<Event>) {
    tokio::spawn(async move {
        let result = fetcher.discover_metrics().await;
        let _ = tx.send(Event::MetricNamesScraped(result));
    });
}

/// Forward key presses and resizes from the terminal into the event queue
fn spawn_input_reader(tx: UnboundedSender<Event>, shutdown: Arc<AtomicBool>) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        while !shutdown.load(Ordering::Relaxed) {
            match event::poll(INPUT_POLL) {
                Ok(false) => continue,
                Ok(true) => {}
                Err(e) => {
                    warn!(error = %e, "Terminal input polling failed");
                    break;
                }
            }

            let forwarded = match event::read() {
                Ok(TermEvent::Key(key)) if key.kind == KeyEventKind::Press => Event::Key(key),
                Ok(TermEvent::Resize(width, height)) => Event::Resize { width, height },
                Ok(_) => continue,
                Err(e) => {
                    warn!(error = %e, "Reading terminal input failed");
                    break;
                }
            };

            if tx.send(forwarded).is_err() {
                break;
            }
        }
    })
}
