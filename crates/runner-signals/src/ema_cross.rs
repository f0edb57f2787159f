//! Fast/slow EMA crossover filtered by a long trend EMA.

use runner_core::{
    error::SignalError,
    traits::{EntryDecision, EntrySignal, Indicator, SignalConfig},
    types::{BarSeries, Direction},
};
use runner_indicators::{crossed_over, crossed_under, Ema};
use serde::{Deserialize, Serialize};

/// Configuration for the EMA crossover signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmaCrossConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub trend_period: usize,
}

impl Default for EmaCrossConfig {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            trend_period: 200,
        }
    }
}

impl SignalConfig for EmaCrossConfig {
    fn validate(&self) -> Result<(), SignalError> {
        if self.fast_period == 0 {
            return Err(SignalError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(SignalError::InvalidConfig(
                "Fast period must be less than slow period".into(),
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

/// EMA crossover signal.
pub struct EmaCrossSignal {
    config: EmaCrossConfig,
    fast: Ema,
    slow: Ema,
    trend: Ema,
}

impl EmaCrossSignal {
    pub fn new(config: EmaCrossConfig) -> Self {
        Self {
            fast: Ema::new(config.fast_period),
            slow: Ema::new(config.slow_period),
            trend: Ema::new(config.trend_period),
            config,
        }
    }
}

impl Default for EmaCrossSignal {
    fn default() -> Self {
        Self::new(EmaCrossConfig::default())
    }
}

impl EntrySignal for EmaCrossSignal {
    fn name(&self) -> &str {
        "ema_cross"
    }

    fn description(&self) -> &str {
        "Fresh fast/slow EMA cross on the side of the trend EMA"
    }

    fn evaluate(&self, series: &BarSeries) -> EntryDecision {
        if !self.is_warmed_up(series.len()) {
            return EntryDecision::none()
                .with_reasons(vec!["ema_cross: insufficient data".into()]);
        }

        let closes = series.closes();
        let fast = self.fast.calculate(&closes);
        let slow = self.slow.calculate(&closes);
        let (Some(trend), Some(&close)) = (self.trend.latest(&closes), closes.last()) else {
            return EntryDecision::none();
        };

        if crossed_over(&fast, &slow) && close > trend {
            return EntryDecision::enter(
                Direction::Long,
                vec![format!(
                    "ema_cross: EMA{} crossed above EMA{} + above EMA{}",
                    self.config.fast_period, self.config.slow_period, self.config.trend_period
                )],
            );
        }
        if crossed_under(&fast, &slow) && close < trend {
            return EntryDecision::enter(
                Direction::Short,
                vec![format!(
                    "ema_cross: EMA{} crossed below EMA{} + below EMA{}",
                    self.config.fast_period, self.config.slow_period, self.config.trend_period
                )],
            );
        }

        EntryDecision::none().with_reasons(vec!["ema_cross: no signal".into()])
    }

    fn warmup_period(&self) -> usize {
        self.config.slow_period.max(self.config.trend_period) + 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::flat_series;

    fn small() -> EmaCrossSignal {
        EmaCrossSignal::new(EmaCrossConfig {
            fast_period: 2,
            slow_period: 4,
            trend_period: 6,
        })
    }

    #[test]
    fn test_cross_up_above_trend() {
        let series = flat_series(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 9.0, 12.0]);
        let decision = small().evaluate(&series);
        assert_eq!(decision.direction, Some(Direction::Long));
    }

    #[test]
    fn test_cross_down_below_trend() {
        let series = flat_series(&[10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 11.0, 8.0]);
        let decision = small().evaluate(&series);
        assert_eq!(decision.direction, Some(Direction::Short));
    }

    #[test]
    fn test_no_cross_no_signal() {
        let decision = small().evaluate(&flat_series(&[10.0; 12]));
        assert!(!decision.fired());
        assert_eq!(decision.reasons, vec!["ema_cross: no signal".to_string()]);
    }
}
