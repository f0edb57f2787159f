//! Engine configuration.

use serde::{Deserialize, Serialize};
use runner_core::{MarginType, TradingError, TradingResult};
use runner_data::SnapshotSettings;
use runner_risk::{AllocationPolicy, ExitLevels, LeverageMap};

/// Everything the tick path needs, fixed for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub levels: ExitLevels,
    pub allocation: AllocationPolicy,
    pub leverage: LeverageMap,
    pub margin_type: MarginType,
    pub quote_asset: String,
    /// Minimum idle time after an exit before the next entry
    pub cooldown_secs: i64,
    /// Target reached within this many seconds of entry latches fast mode
    pub fast_window_secs: i64,
    pub pump_lookback_bars: usize,
    pub pump_pct: f64,
    /// Stop opening positions this many days after start; 0 disables
    pub auto_shutdown_days: u32,
    pub snapshot: SnapshotSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            levels: ExitLevels::default(),
            allocation: AllocationPolicy::default(),
            leverage: LeverageMap::default(),
            margin_type: MarginType::Isolated,
            quote_asset: "USDT".to_string(),
            cooldown_secs: 60,
            fast_window_secs: 600,
            pump_lookback_bars: 5,
            pump_pct: 0.10,
            auto_shutdown_days: 7,
            snapshot: SnapshotSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Set exit levels.
    pub fn with_levels(mut self, levels: ExitLevels) -> Self {
        self.levels = levels;
        self
    }

    /// Set the allocation policy.
    pub fn with_allocation(mut self, allocation: AllocationPolicy) -> Self {
        self.allocation = allocation;
        self
    }

    /// Set leverage.
    pub fn with_leverage(mut self, leverage: LeverageMap) -> Self {
        self.leverage = leverage;
        self
    }

    /// Set cooldown in seconds.
    pub fn with_cooldown(mut self, secs: i64) -> Self {
        self.cooldown_secs = secs;
        self
    }

    pub fn validate(&self) -> TradingResult<()> {
        self.levels.validate().map_err(TradingError::Configuration)?;
        self.allocation.validate().map_err(TradingError::Configuration)?;
        if self.cooldown_secs < 0 || self.fast_window_secs < 0 {
            return Err(TradingError::Configuration(
                "cooldown_secs and fast_window_secs must be non-negative".into(),
            ));
        }
        if self.pump_pct.is_nan() || self.pump_pct <= 0.0 || self.pump_lookback_bars == 0 {
            return Err(TradingError::Configuration(
                "pump_pct and pump_lookback_bars must be positive".into(),
            ));
        }
        if self.snapshot.candle_limit == 0 || self.snapshot.max_snapshot_age_secs <= 0 {
            return Err(TradingError::Configuration(
                "candle_limit and max_snapshot_age_secs must be positive".into(),
            ));
        }
        if self.quote_asset.trim().is_empty() {
            return Err(TradingError::Configuration("quote_asset is empty".into()));
        }
        Ok(())
    }

    /// Auto-shutdown horizon in seconds, if enabled.
    pub fn auto_shutdown_secs(&self) -> Option<i64> {
        (self.auto_shutdown_days > 0).then(|| i64::from(self.auto_shutdown_days) * 86_400)
    }
}
