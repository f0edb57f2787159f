//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use runner_config::load_config;
use runner_signals::SignalRegistry;

use crate::cli::ValidateArgs;

pub async fn run(args: ValidateArgs, config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }
    if let Err(e) = SignalRegistry::new().create(&config.signal.name, config.signal.params.clone()) {
        println!("Configuration error: {}", e);
        return Err(e.into());
    }

    println!("Configuration is valid!");
    println!();
    println!("Symbol: {}", config.symbol());
    println!(
        "Venue: {} ({})",
        config.venue.kind,
        if config.venue.testnet { "testnet" } else { "production" }
    );
    println!("Entry signal: {}", config.signal.name);
    println!(
        "Stop {} | target {} | trail {} | lock eps {}",
        config.trading.stop_loss_pct,
        config.trading.target_pct,
        config.trading.trail_pct,
        config.trading.lock_eps
    );
    println!("Allocation: {:?}", config.allocation.mode);
    if config.venue.kind.is_futures() {
        println!(
            "Leverage: {}x, margin {}",
            config.venue.leverage,
            config.venue.margin_type.as_str()
        );
    }
    println!("Log level: {}", config.logging.level);

    if args.print {
        println!();
        println!("{}", config.to_toml()?);
    }

    Ok(())
}
