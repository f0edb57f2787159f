//! Live trading on Binance.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use runner_config::load_config;
use runner_core::{Exchange, Venue};
use runner_exchange::{BinanceCredentials, BinanceFutures, BinanceSpot};

use super::apply_overrides;
use crate::cli::session::{report, run_session, SessionOptions};
use crate::cli::RunArgs;

pub async fn run(args: RunArgs, config_path: &Path) -> Result<()> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    apply_overrides(&mut config, args.symbol.as_deref(), args.venue.as_deref())?;

    let credentials =
        BinanceCredentials::from_env(&config.venue.api_key_env, &config.venue.api_secret_env)
            .context("Missing API credentials")?;
    let settings = config.binance_settings();
    let exchange: Arc<dyn Exchange> = match config.venue.kind {
        Venue::Spot => Arc::new(BinanceSpot::new(Some(credentials), &settings)?),
        Venue::Futures => Arc::new(BinanceFutures::new(Some(credentials), &settings)?),
    };

    if let Err(e) = exchange.sync_time().await {
        warn!(error = %e, "Clock sync failed, using the local clock");
    }

    info!(
        exchange = exchange.name(),
        venue = %config.venue.kind,
        testnet = config.venue.testnet,
        symbol = %config.symbol(),
        signal = %config.signal.name,
        "Starting live session"
    );

    let ctx = run_session(
        &config,
        exchange,
        SessionOptions {
            start_enabled: args.go,
            dashboard: args.dashboard,
        },
    )
    .await?;
    report(&ctx);
    Ok(())
}
