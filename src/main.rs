//! Fast runner CLI application.

mod cli;
mod console;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use runner_config::{load_config, LoggingConfig};
use runner_monitor::setup_logging;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logging defaults come from the config file when it loads
    let logging = load_config(&cli.config)
        .map(|c| c.logging)
        .unwrap_or_else(|_| LoggingConfig::default());
    let level = cli
        .log_level
        .as_ref()
        .map_or(logging.level.as_str(), |l| l.as_str());
    let dashboard = matches!(&cli.command, Commands::Run(a) if a.dashboard)
        || matches!(&cli.command, Commands::Paper(a) if a.dashboard);
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| logging.file.as_ref().map(PathBuf::from))
        .or_else(|| dashboard.then(|| PathBuf::from("runner.log")));
    setup_logging(level, cli.json_logs || logging.json, log_file.as_deref())?;

    match cli.command {
        Commands::Run(args) => cli::commands::run::run(args, &cli.config).await,
        Commands::Paper(args) => cli::commands::paper::run(args, &cli.config).await,
        Commands::Signals(args) => cli::commands::signals::run(args, &cli.config).await,
        Commands::ValidateConfig(args) => cli::commands::validate::run(args, &cli.config).await,
    }
}
