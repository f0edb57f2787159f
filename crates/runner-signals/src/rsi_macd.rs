//! RSI reversal confirmed by a MACD cross and an EMA trend filter.
//!
//! LONG when RSI climbs back above the oversold level on the same bar the
//! MACD line crosses above its signal line, with price above the trend EMA.
//! SHORT is the mirror image around the overbought level.

use runner_core::{
    error::SignalError,
    traits::{EntryDecision, EntrySignal, Indicator, SignalConfig},
    types::{BarSeries, Direction},
};
use runner_indicators::{crossed_over, crossed_under, Ema, Macd, Rsi};
use serde::{Deserialize, Serialize};

/// Configuration for the RSI + MACD signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RsiMacdConfig {
    pub rsi_period: usize,
    /// Oversold level a long bounce must cross
    pub rsi_low: f64,
    /// Overbought level a short rejection must cross
    pub rsi_high: f64,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    /// Trend filter EMA period
    pub trend_period: usize,
}

impl Default for RsiMacdConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            rsi_low: 35.0,
            rsi_high: 65.0,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            trend_period: 200,
        }
    }
}

impl SignalConfig for RsiMacdConfig {
    fn validate(&self) -> Result<(), SignalError> {
        if self.rsi_period < 2 {
            return Err(SignalError::InvalidConfig(
                "RSI period must be at least 2".into(),
            ));
        }
        if !(0.0..=100.0).contains(&self.rsi_low)
            || !(0.0..=100.0).contains(&self.rsi_high)
            || self.rsi_low >= self.rsi_high
        {
            return Err(SignalError::InvalidConfig(
                "RSI levels must satisfy 0 <= low < high <= 100".into(),
            ));
        }
        if self.macd_fast == 0 || self.macd_fast >= self.macd_slow || self.macd_signal == 0 {
            return Err(SignalError::InvalidConfig(
                "MACD periods must satisfy 0 < fast < slow and signal > 0".into(),
            ));
        }
        if self.trend_period == 0 {
            return Err(SignalError::InvalidConfig(
                "Trend period must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// RSI + MACD reversal signal.
pub struct RsiMacdSignal {
    config: RsiMacdConfig,
    rsi: Rsi,
    macd: Macd,
    trend: Ema,
}

impl RsiMacdSignal {
    pub fn new(config: RsiMacdConfig) -> Self {
        Self {
            rsi: Rsi::new(config.rsi_period),
            macd: Macd::with_periods(config.macd_fast, config.macd_slow, config.macd_signal),
            trend: Ema::new(config.trend_period),
            config,
        }
    }
}

impl Default for RsiMacdSignal {
    fn default() -> Self {
        Self::new(RsiMacdConfig::default())
    }
}

impl EntrySignal for RsiMacdSignal {
    fn name(&self) -> &str {
        "rsi_macd"
    }

    fn description(&self) -> &str {
        "RSI bounce off oversold/overbought confirmed by a MACD cross and EMA trend"
    }

    fn evaluate(&self, series: &BarSeries) -> EntryDecision {
        if !self.is_warmed_up(series.len()) {
            return EntryDecision::none().with_reasons(vec![format!(
                "rsi_macd: insufficient data ({} < {})",
                series.len(),
                self.warmup_period()
            )]);
        }

        let closes = series.closes();
        let rsi = self.rsi.calculate(&closes);
        let macd = self.macd.calculate(&closes);
        let (Some(trend), [.., rsi_prev, rsi_now]) = (self.trend.latest(&closes), rsi.as_slice())
        else {
            return EntryDecision::none().with_reasons(vec!["rsi_macd: insufficient data".into()]);
        };
        let Some(&close) = closes.last() else {
            return EntryDecision::none();
        };

        let line: Vec<f64> = macd.iter().map(|m| m.macd).collect();
        let signal: Vec<f64> = macd.iter().map(|m| m.signal).collect();
        let (lo, hi) = (self.config.rsi_low, self.config.rsi_high);

        if *rsi_prev < lo && *rsi_now > lo && crossed_over(&line, &signal) && close > trend {
            return EntryDecision::enter(
                Direction::Long,
                vec![format!(
                    "rsi_macd: RSI {:.1} bounced above {} + MACD crossed up + above EMA{}",
                    rsi_now, lo, self.config.trend_period
                )],
            );
        }
        if *rsi_prev > hi && *rsi_now < hi && crossed_under(&line, &signal) && close < trend {
            return EntryDecision::enter(
                Direction::Short,
                vec![format!(
                    "rsi_macd: RSI {:.1} fell below {} + MACD crossed down + below EMA{}",
                    rsi_now, hi, self.config.trend_period
                )],
            );
        }

        EntryDecision::none().with_reasons(vec!["rsi_macd: no signal".into()])
    }

    fn warmup_period(&self) -> usize {
        // two points of every series so crosses can be detected
        self.config
            .trend_period
            .max(self.macd.period() + 1)
            .max(self.rsi.period() + 1)
    }
}
