//! Configuration management.
//!
//! A TOML file layered with `RUNNER__`-prefixed environment variables, for
//! example `RUNNER__TRADING__SYMBOL=ETHUSDT` or `RUNNER__VENUE__TESTNET=false`.

mod settings;

pub use settings::{
    AppConfig, LoggingConfig, PaperSettings, SchedulerSettings, SignalSettings, TradingSettings,
    VenueSettings,
};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix("RUNNER")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use runner_core::Venue;
    use runner_risk::AllocationMode;
    use std::path::PathBuf;

    fn write_temp(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join(format!("runner-config-{}-{}.toml", name, std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_shipped_default_file_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = load_config(&path).unwrap();
        config.validate().unwrap();
        assert_eq!(config.trading.symbol, "BTCUSDT");
        assert_eq!(config.scheduler.tick_interval_secs, 5);
        assert_eq!(config.signal.name, "combined");
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let path = write_temp(
            "partial",
            r#"
[trading]
symbol = "ethusdt"
stop_loss_pct = 0.015

[venue]
kind = "futures"
leverage = 20

[venue.leverage_overrides]
BTCUSDT = 15

[allocation]
mode = "fixed"
fixed_quote = 25
"#,
        );
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.trading.symbol, "ethusdt");
        assert_eq!(config.trading.cooldown_secs, 60);
        assert_eq!(config.venue.kind, Venue::Futures);
        assert_eq!(config.allocation.mode, AllocationMode::Fixed);
        assert_eq!(config.allocation.fixed_quote, dec!(25));

        let engine = config.engine_config();
        assert_eq!(engine.levels.stop_loss_pct, dec!(0.015));
        assert_eq!(engine.leverage.for_symbol("BTCUSDT"), 15);
        assert_eq!(engine.leverage.for_symbol("ETHUSDT"), 20);
    }

    #[test]
    fn test_missing_file_fails() {
        assert!(load_config(Path::new("/nonexistent/runner.toml")).is_err());
    }
}
