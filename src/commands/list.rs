//! List command implementation
//!
//! Prints every metric name the endpoint exposes, one per line.

use anyhow::Result;

use metric_scope::{config::MonitorConfig, monitor::MetricsFetcher};

/// Execute the list command
pub async fn execute(cfg: MonitorConfig) -> Result<()> {
    let fetcher = MetricsFetcher::new(cfg.endpoint().to_string());
    let names = fetcher
        .discover_metrics()
        .await
        .map_err(|e| anyhow::anyhow!("Error fetching metrics: {}", e))?;

    if names.is_empty() {
        anyhow::bail!("No metrics found at the endpoint");
    }

    for name in names {
        println!("{}", name);
    }

    Ok(())
}
