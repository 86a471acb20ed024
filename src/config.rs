use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default configuration file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "metric-scope.toml";

/// Prefix of environment overrides, e.g. `METRIC_SCOPE_INTERVAL_SECS`
pub const ENV_PREFIX: &str = "METRIC_SCOPE";

const MIN_INTERVAL_SECS: f64 = 0.1;
const MAX_INTERVAL_SECS: f64 = 300.0;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MonitorConfig {
    pub url: Option<String>,
    pub metric: Option<String>,
    pub interval_secs: f64,
    pub max_points_per_series: Option<usize>,
    pub restore_visibility_on_cancel: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            url: None,
            metric: None,
            interval_secs: 2.0,
            max_points_per_series: None,
            restore_visibility_on_cancel: false,
            log_file: None,
        }
    }
}

/// Command-line values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub url: Option<String>,
    pub metric: Option<String>,
    pub interval_secs: Option<f64>,
    pub max_points_per_series: Option<usize>,
    pub restore_visibility_on_cancel: bool,
    pub log_file: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.interval_secs)
    }

    /// The endpoint URL; only valid after [`validate_config`] passed
    pub fn endpoint(&self) -> &str {
        self.url.as_deref().unwrap_or_default()
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if overrides.url.is_some() {
            self.url = overrides.url;
        }
        if overrides.metric.is_some() {
            self.metric = overrides.metric;
        }
        if let Some(interval) = overrides.interval_secs {
            self.interval_secs = interval;
        }
        if overrides.max_points_per_series.is_some() {
            self.max_points_per_series = overrides.max_points_per_series;
        }
        if overrides.restore_visibility_on_cancel {
            self.restore_visibility_on_cancel = true;
        }
        if overrides.log_file.is_some() {
            self.log_file = overrides.log_file;
        }
    }
}

/// Load configuration from defaults, an optional file and the environment
///
/// A missing file is not an error; a malformed one is.
pub fn load_config(path: &Path) -> anyhow::Result<MonitorConfig> {
    let defaults = MonitorConfig::default();
    let config = config::Config::builder()
        .set_default("interval_secs", defaults.interval_secs)?
        .set_default("restore_visibility_on_cancel", defaults.restore_visibility_on_cancel)?
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let cfg: MonitorConfig = config.try_deserialize()?;
    Ok(cfg)
}

pub fn validate_config(cfg: &MonitorConfig) -> anyhow::Result<()> {
    let Some(url) = cfg.url.as_deref() else {
        anyhow::bail!("No metrics endpoint URL given (pass it as an argument or set `url` in the config)");
    };

    if !(url.starts_with("http://") || url.starts_with("https://")) {
        anyhow::bail!("Invalid URL '{}': must start with http:// or https://", url);
    }

    if !(MIN_INTERVAL_SECS..=MAX_INTERVAL_SECS).contains(&cfg.interval_secs) {
        anyhow::bail!(
            "Invalid interval: {}. Must be between {} and {} seconds",
            cfg.interval_secs,
            MIN_INTERVAL_SECS,
            MAX_INTERVAL_SECS
        );
    }

    if cfg.max_points_per_series == Some(0) {
        anyhow::bail!("max_points_per_series must be at least 1 when set");
    }

    if let Some(metric) = &cfg.metric {
        if metric.trim().is_empty() {
            anyhow::bail!("Metric name cannot be empty");
        }
    }

    Ok(())
}
