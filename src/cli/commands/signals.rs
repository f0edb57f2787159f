//! List entry signals or evaluate one on recorded candles.

use anyhow::{Context, Result};
use std::path::Path;
use runner_config::load_config;
use runner_core::{BarSeries, Timeframe};
use runner_signals::SignalRegistry;

use crate::cli::SignalsArgs;

pub async fn run(args: SignalsArgs, config_path: &Path) -> Result<()> {
    let registry = SignalRegistry::new();

    let Some(data) = &args.data else {
        println!("Available Entry Signals");
        println!("═══════════════════════════════════════════════════════════");
        println!();
        for info in registry.list() {
            println!("  {} ", info.name);
            println!("  ───────────────────────────────────────────────────────");
            println!("  {}", info.description);
            println!("  defaults: {}", info.default_config);
            println!();
        }
        println!("Select one with [signal] name = \"...\" in the config file.");
        return Ok(());
    };

    let config = load_config(config_path).unwrap_or_default();
    let name = args.name.clone().unwrap_or_else(|| config.signal.name.clone());
    // configured params only apply to the configured signal
    let params = if name == config.signal.name {
        config.signal.params.clone()
    } else {
        serde_json::Value::Null
    };
    let signal = registry
        .create(&name, params)
        .with_context(|| format!("Failed to create entry signal '{}'", name))?;

    let bars = runner_data::load_csv(data)
        .with_context(|| format!("Failed to load candles from {}", data.display()))?;
    let mut series = BarSeries::new(config.symbol(), Timeframe::Minute1);
    series.extend(bars);

    println!("Signal: {}  |  candles: {}", signal.name(), series.len());
    if !signal.is_warmed_up(series.len()) {
        println!(
            "Not enough candles: need {}, have {}",
            signal.warmup_period(),
            series.len()
        );
        return Ok(());
    }

    let decision = signal.evaluate(&series);
    match decision.direction {
        Some(direction) => println!("Decision: {}", direction),
        None => println!("Decision: no entry"),
    }
    for reason in &decision.reasons {
        println!("  - {}", reason);
    }
    Ok(())
}
