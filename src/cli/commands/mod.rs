//! CLI command implementations.

pub mod paper;
pub mod run;
pub mod signals;
pub mod validate;

use anyhow::{Context, Result};
use runner_config::AppConfig;
use runner_core::Venue;

/// Apply `--symbol` / `--venue` overrides and validate.
pub(crate) fn apply_overrides(
    config: &mut AppConfig,
    symbol: Option<&str>,
    venue: Option<&str>,
) -> Result<()> {
    if let Some(symbol) = symbol {
        config.trading.symbol = symbol.to_string();
    }
    if let Some(venue) = venue {
        config.venue.kind = venue.parse::<Venue>().map_err(anyhow::Error::msg)?;
    }
    config.validate().context("Invalid configuration")
}
