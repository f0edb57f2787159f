//! Donchian channel breakout, gated on ATR so chop does not trigger it.

use runner_core::{
    error::SignalError,
    traits::{EntryDecision, EntrySignal, SignalConfig},
    types::{BarSeries, Direction},
};
use runner_indicators::{Atr, Donchian};
use serde::{Deserialize, Serialize};

/// Configuration for the breakout signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakoutAtrConfig {
    pub channel_period: usize,
    pub atr_period: usize,
    /// Minimum ATR / close for a breakout to count
    pub min_atr_frac: f64,
}

impl Default for BreakoutAtrConfig {
    fn default() -> Self {
        Self {
            channel_period: 20,
            atr_period: 14,
            min_atr_frac: 0.004,
        }
    }
}

impl SignalConfig for BreakoutAtrConfig {
    fn validate(&self) -> Result<(), SignalError> {
        if self.channel_period == 0 || self.atr_period == 0 {
            return Err(SignalError::InvalidConfig(
                "Channel and ATR periods must be greater than 0".into(),
            ));
        }
        if self.min_atr_frac < 0.0 {
            return Err(SignalError::InvalidConfig(
                "min_atr_frac must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Donchian breakout signal.
pub struct BreakoutAtrSignal {
    config: BreakoutAtrConfig,
    channel: Donchian,
    atr: Atr,
}

impl BreakoutAtrSignal {
    pub fn new(config: BreakoutAtrConfig) -> Self {
        Self {
            channel: Donchian::new(config.channel_period),
            atr: Atr::new(config.atr_period),
            config,
        }
    }
}

impl Default for BreakoutAtrSignal {
    fn default() -> Self {
        Self::new(BreakoutAtrConfig::default())
    }
}

impl EntrySignal for BreakoutAtrSignal {
    fn name(&self) -> &str {
        "breakout_atr"
    }

    fn description(&self) -> &str {
        "Close beyond the prior Donchian channel with enough ATR"
    }

    fn evaluate(&self, series: &BarSeries) -> EntryDecision {
        if !self.is_warmed_up(series.len()) {
            return EntryDecision::none()
                .with_reasons(vec!["breakout_atr: insufficient data".into()]);
        }

        let highs = series.highs();
        let lows = series.lows();
        let closes = series.closes();
        let n = closes.len();

        // channel as of the previous bar; the current close must break it
        let channel = self.channel.calculate_hl(&highs[..n - 1], &lows[..n - 1]);
        let atr = self.atr.calculate_ohlc(&highs, &lows, &closes);
        let (Some(prior), Some(&atr), Some(&close)) = (channel.last(), atr.last(), closes.last())
        else {
            return EntryDecision::none();
        };

        let atr_frac = atr / close.max(1e-9);
        if atr_frac < self.config.min_atr_frac {
            return EntryDecision::none().with_reasons(vec![format!(
                "breakout_atr: ATR too small ({:.4} < {})",
                atr_frac, self.config.min_atr_frac
            )]);
        }

        if close > prior.upper {
            return EntryDecision::enter(
                Direction::Long,
                vec![format!(
                    "breakout_atr: close {:.4} broke above {:.4} with ATR {:.4}",
                    close, prior.upper, atr_frac
                )],
            );
        }
        if close < prior.lower {
            return EntryDecision::enter(
                Direction::Short,
                vec![format!(
                    "breakout_atr: close {:.4} broke below {:.4} with ATR {:.4}",
                    close, prior.lower, atr_frac
                )],
            );
        }

        EntryDecision::none().with_reasons(vec!["breakout_atr: no signal".into()])
    }

    fn warmup_period(&self) -> usize {
        self.config.channel_period.max(self.config.atr_period) + 2
    }
}
