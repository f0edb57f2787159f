//! Configuration structures.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use runner_core::{MarginType, TradingError, TradingResult, Venue};
use runner_data::SnapshotSettings;
use runner_engine::{EngineConfig, SchedulerConfig};
use runner_exchange::BinanceSettings;
use runner_risk::{AllocationPolicy, ExitLevels, LeverageMap};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub trading: TradingSettings,
    #[serde(default)]
    pub allocation: AllocationPolicy,
    #[serde(default)]
    pub venue: VenueSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub signal: SignalSettings,
    #[serde(default)]
    pub paper: PaperSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Exit levels and entry timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingSettings {
    pub symbol: String,
    pub quote_asset: String,
    pub target_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub trail_pct: Decimal,
    pub lock_eps: Decimal,
    pub cooldown_secs: i64,
    pub fast_window_secs: i64,
    pub pump_lookback_bars: usize,
    pub pump_pct: f64,
    /// 0 disables
    pub auto_shutdown_days: u32,
    /// Accept entries from the first tick instead of waiting for `go`
    pub start_enabled: bool,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            quote_asset: "USDT".to_string(),
            target_pct: dec!(0.10),
            stop_loss_pct: dec!(0.01),
            trail_pct: dec!(0.02),
            lock_eps: dec!(0.002),
            cooldown_secs: 60,
            fast_window_secs: 600,
            pump_lookback_bars: 5,
            pump_pct: 0.10,
            auto_shutdown_days: 7,
            start_enabled: false,
        }
    }
}

/// Venue selection and Binance connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VenueSettings {
    pub kind: Venue,
    pub testnet: bool,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Environment variable holding the API secret
    pub api_secret_env: String,
    pub timeout_secs: u64,
    pub recv_window_ms: u64,
    /// Futures only
    pub leverage: u32,
    pub leverage_overrides: BTreeMap<String, u32>,
    pub margin_type: MarginType,
}

impl Default for VenueSettings {
    fn default() -> Self {
        Self {
            kind: Venue::Spot,
            testnet: true,
            api_key_env: "BINANCE_API_KEY".to_string(),
            api_secret_env: "BINANCE_API_SECRET".to_string(),
            timeout_secs: 15,
            recv_window_ms: 5000,
            leverage: 10,
            leverage_overrides: BTreeMap::new(),
            margin_type: MarginType::Isolated,
        }
    }
}

/// Tick and ranking cadence, snapshot limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerSettings {
    pub tick_interval_secs: u64,
    /// 0 disables the ranking lane
    pub scan_interval_mins: u64,
    pub max_snapshot_age_secs: i64,
    pub candle_limit: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            scan_interval_mins: 60,
            max_snapshot_age_secs: 300,
            candle_limit: 900,
        }
    }
}

/// Entry signal selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    pub name: String,
    /// Signal-specific parameters; missing fields take defaults
    pub params: serde_json::Value,
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            name: "combined".to_string(),
            params: serde_json::json!({ "min_votes": 2 }),
        }
    }
}

/// Offline paper exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    pub initial_balance: Decimal,
    pub slippage_pct: Decimal,
    pub commission_rate: Decimal,
}

impl Default for PaperSettings {
    fn default() -> Self {
        Self {
            initial_balance: dec!(1000),
            slippage_pct: Decimal::ZERO,
            commission_rate: dec!(0.001),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Target symbol, upper-cased.
    pub fn symbol(&self) -> String {
        self.trading.symbol.trim().to_uppercase()
    }

    pub fn levels(&self) -> ExitLevels {
        ExitLevels {
            target_pct: self.trading.target_pct,
            stop_loss_pct: self.trading.stop_loss_pct,
            trail_pct: self.trading.trail_pct,
            lock_eps: self.trading.lock_eps,
        }
    }

    pub fn leverage(&self) -> LeverageMap {
        self.venue
            .leverage_overrides
            .iter()
            .fold(LeverageMap::new(self.venue.leverage), |map, (symbol, lev)| {
                map.with_override(symbol.as_str(), *lev)
            })
    }

    pub fn snapshot_settings(&self) -> SnapshotSettings {
        SnapshotSettings {
            candle_limit: self.scheduler.candle_limit,
            max_snapshot_age_secs: self.scheduler.max_snapshot_age_secs,
            ..Default::default()
        }
    }

    /// Settings for the tick path.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            levels: self.levels(),
            allocation: self.allocation.clone(),
            leverage: self.leverage(),
            margin_type: self.venue.margin_type,
            quote_asset: self.trading.quote_asset.trim().to_uppercase(),
            cooldown_secs: self.trading.cooldown_secs,
            fast_window_secs: self.trading.fast_window_secs,
            pump_lookback_bars: self.trading.pump_lookback_bars,
            pump_pct: self.trading.pump_pct,
            auto_shutdown_days: self.trading.auto_shutdown_days,
            snapshot: self.snapshot_settings(),
        }
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig::new(
            Duration::from_secs(self.scheduler.tick_interval_secs),
            Duration::from_secs(self.scheduler.scan_interval_mins * 60),
        )
    }

    pub fn binance_settings(&self) -> BinanceSettings {
        BinanceSettings {
            testnet: self.venue.testnet,
            timeout: Duration::from_secs(self.venue.timeout_secs),
            recv_window_ms: self.venue.recv_window_ms,
        }
    }

    /// Check everything a startup would trip over.
    pub fn validate(&self) -> TradingResult<()> {
        let symbol = self.symbol();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(TradingError::Configuration(format!(
                "invalid symbol '{}'",
                self.trading.symbol
            )));
        }
        if !symbol.ends_with(&self.trading.quote_asset.trim().to_uppercase()) {
            return Err(TradingError::Configuration(format!(
                "symbol {} is not quoted in {}",
                symbol, self.trading.quote_asset
            )));
        }
        if self.scheduler.tick_interval_secs == 0 {
            return Err(TradingError::Configuration(
                "tick_interval_secs must be at least 1".into(),
            ));
        }
        if self.scheduler.candle_limit == 0 || self.scheduler.max_snapshot_age_secs <= 0 {
            return Err(TradingError::Configuration(
                "candle_limit and max_snapshot_age_secs must be positive".into(),
            ));
        }
        if self.venue.timeout_secs == 0 {
            return Err(TradingError::Configuration(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if self.venue.recv_window_ms == 0 || self.venue.recv_window_ms > 60_000 {
            return Err(TradingError::Configuration(
                "recv_window_ms must be in 1..=60000".into(),
            ));
        }
        if self.paper.initial_balance < Decimal::ZERO
            || self.paper.slippage_pct < Decimal::ZERO
            || self.paper.commission_rate < Decimal::ZERO
        {
            return Err(TradingError::Configuration(
                "paper settings must be non-negative".into(),
            ));
        }
        self.engine_config().validate()
    }

    /// Render as TOML.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_core::ErrorKind;

    #[test]
    fn test_defaults_validate() {
        let config = AppConfig::default();
        config.validate().unwrap();

        let engine = config.engine_config();
        assert_eq!(engine.levels.lock_level(dec!(100), runner_core::Direction::Long), dec!(109.8));
        assert_eq!(engine.cooldown_secs, 60);
        assert_eq!(engine.auto_shutdown_days, 7);
        assert_eq!(engine.snapshot.candle_limit, 900);

        let scheduler = config.scheduler_config();
        assert_eq!(scheduler.tick_interval, Duration::from_secs(5));
        assert_eq!(scheduler.scan_interval, Duration::from_secs(3600));

        let binance = config.binance_settings();
        assert!(binance.testnet);
        assert_eq!(binance.recv_window_ms, 5000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let mut config = AppConfig::default();
        config.trading.symbol = "BTC/USDT".into();
        assert_eq!(
            config.validate().unwrap_err().kind(),
            ErrorKind::Configuration
        );

        let mut config = AppConfig::default();
        config.trading.symbol = "BTCEUR".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.trading.trail_pct = Decimal::ONE;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scheduler.tick_interval_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_leverage_overrides_case_insensitive() {
        let mut config = AppConfig::default();
        config.venue.leverage_overrides.insert("ethusdt".into(), 25);
        assert_eq!(config.leverage().for_symbol("ETHUSDT"), 25);
        assert_eq!(config.leverage().for_symbol("BTCUSDT"), 10);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("[trading]"));
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.trading.symbol, "BTCUSDT");
        assert_eq!(parsed.allocation, config.allocation);
    }
}
