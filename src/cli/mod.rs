//! CLI definitions.

pub mod commands;
pub mod session;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "runner")]
#[command(author, version, about = "Single-position crypto runner with fast-mode trailing stops")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Log level (defaults to the config file's)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    /// Append logs to this file instead of stdout
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Trade on Binance
    Run(RunArgs),
    /// Trade against an in-memory exchange fed from a CSV file
    Paper(PaperArgs),
    /// List entry signals, or evaluate one on a CSV file
    Signals(SignalsArgs),
    /// Validate configuration
    ValidateConfig(ValidateArgs),
}

#[derive(clap::Args)]
pub struct RunArgs {
    /// Symbol to trade (overrides the config)
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,

    /// spot or futures (overrides the config)
    #[arg(long)]
    pub venue: Option<String>,

    /// Accept entries right away instead of waiting for `go`
    #[arg(long)]
    pub go: bool,

    /// Show the terminal dashboard instead of the console
    #[arg(long)]
    pub dashboard: bool,
}

#[derive(clap::Args)]
pub struct PaperArgs {
    /// CSV file with 1-minute candles
    #[arg(short, long)]
    pub data: PathBuf,

    /// Symbol the candles belong to (overrides the config)
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,

    /// spot or futures (overrides the config)
    #[arg(long)]
    pub venue: Option<String>,

    /// Starting quote balance (overrides the config)
    #[arg(long)]
    pub capital: Option<f64>,

    /// Candles revealed before the session starts
    #[arg(long, default_value = "300")]
    pub preload: usize,

    /// Seconds between revealed candles
    #[arg(long, default_value = "60")]
    pub bar_secs: u64,

    /// Accept entries right away instead of waiting for `go`
    #[arg(long)]
    pub go: bool,

    /// Show the terminal dashboard instead of the console
    #[arg(long)]
    pub dashboard: bool,

    /// Write the closed trades as JSON here on exit
    #[arg(long)]
    pub save: Option<PathBuf>,
}

#[derive(clap::Args)]
pub struct SignalsArgs {
    /// Evaluate on this CSV file instead of listing
    #[arg(short, long)]
    pub data: Option<PathBuf>,

    /// Signal to evaluate (defaults to the configured one)
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(clap::Args)]
pub struct ValidateArgs {
    /// Print the resolved configuration as TOML
    #[arg(long)]
    pub print: bool,
}
