use clap::Parser;
use std::path::PathBuf;

use metric_scope::config::{ConfigOverrides, DEFAULT_CONFIG_FILE};

#[derive(Parser, Debug)]
#[command(name = "metric-scope", version, about = "Terminal explorer for Prometheus-style metrics")]
pub struct Cli {
    /// Metrics endpoint URL (e.g. http://localhost:9100/metrics)
    pub url: Option<String>,

    /// Metric to chart (defaults to the first discovered metric)
    #[arg(short, long)]
    pub metric: Option<String>,

    /// Poll interval in seconds
    #[arg(short, long)]
    pub interval: Option<f64>,

    /// Configuration file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Keep at most this many points per series
    #[arg(long)]
    pub max_points: Option<usize>,

    /// Undo visibility changes when the series picker is cancelled
    #[arg(long)]
    pub restore_on_cancel: bool,

    /// Write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print the available metric names and exit
    #[arg(short, long)]
    pub list: bool,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            url: self.url.clone(),
            metric: self.metric.clone(),
            interval_secs: self.interval,
            max_points_per_series: self.max_points,
            restore_visibility_on_cancel: self.restore_on_cancel,
            log_file: self.log_file.clone(),
        }
    }
}
