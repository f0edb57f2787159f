//! Paper trading against candles replayed from CSV.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use runner_config::load_config;
use runner_exchange::PaperExchange;

use super::apply_overrides;
use crate::cli::session::{report, run_session, SessionOptions};
use crate::cli::PaperArgs;

pub async fn run(args: PaperArgs, config_path: &Path) -> Result<()> {
    let mut config = load_config(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    apply_overrides(&mut config, args.symbol.as_deref(), args.venue.as_deref())?;

    let capital = match args.capital {
        Some(c) => Decimal::try_from(c).context("Invalid --capital")?,
        None => config.paper.initial_balance,
    };
    let symbol = config.symbol();

    let paper = PaperExchange::new(config.venue.kind, &config.trading.quote_asset, capital)
        .with_slippage(config.paper.slippage_pct)
        .with_commission(config.paper.commission_rate);
    let total = paper
        .load_replay_csv(&symbol, &args.data)
        .with_context(|| format!("Failed to load candles from {}", args.data.display()))?;
    for _ in 0..args.preload.min(total) {
        paper.advance(&symbol);
    }
    info!(
        symbol = %symbol,
        venue = %config.venue.kind,
        %capital,
        candles = total,
        preload = args.preload.min(total),
        "Starting paper session"
    );

    let feeder = {
        let paper = paper.clone();
        let symbol = symbol.clone();
        let period = Duration::from_secs(args.bar_secs.max(1));
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(period);
            timer.tick().await;
            loop {
                timer.tick().await;
                if paper.advance(&symbol).is_none() {
                    info!(symbol = %symbol, "Replay finished, price held at the last candle");
                    break;
                }
            }
        })
    };

    let ctx = run_session(
        &config,
        Arc::new(paper.clone()),
        SessionOptions {
            start_enabled: args.go,
            dashboard: args.dashboard,
        },
    )
    .await;
    feeder.abort();
    let ctx = ctx?;

    report(&ctx);
    println!(
        "Paper balance: {} {}",
        paper.balance(&config.trading.quote_asset),
        config.trading.quote_asset
    );

    if let Some(path) = &args.save {
        std::fs::write(path, ctx.journal.to_json()?)?;
        info!(path = %path.display(), "Trades saved");
    }
    Ok(())
}
