use anyhow::Result;
use clap::Parser;

mod cli;
mod commands;

use metric_scope::{
    config::{load_config, validate_config},
    init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let args = cli::Cli::parse();

    // Defaults < config file < environment < command line
    let mut cfg = load_config(&args.config)?;
    cfg.apply(args.overrides());
    validate_config(&cfg)?;

    init_tracing(cfg.log_file.as_deref())?;

    // Dispatch to appropriate command handler
    if args.list {
        commands::list::execute(cfg).await
    } else {
        commands::watch::execute(cfg).await
    }
}
