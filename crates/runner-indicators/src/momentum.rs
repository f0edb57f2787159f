//! Momentum indicators.

use runner_core::traits::Indicator;
use serde::{Deserialize, Serialize};

use crate::moving_average::Ema;

/// Relative Strength Index with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Wilder's smoothing: avg = (prev_avg * (n - 1) + value) / n.
    fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
        if values.len() < period {
            return vec![];
        }

        let n = period as f64;
        let mut avg = values[..period].iter().sum::<f64>() / n;
        let mut result = Vec::with_capacity(values.len() - period + 1);
        result.push(avg);

        for &value in &values[period..] {
            avg = (avg * (n - 1.0) + value) / n;
            result.push(avg);
        }

        result
    }
}

impl Default for Rsi {
    fn default() -> Self {
        Self::new(14)
    }
}

impl Indicator for Rsi {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() <= self.period {
            return vec![];
        }

        let (gains, losses): (Vec<f64>, Vec<f64>) = data
            .windows(2)
            .map(|w| {
                let change = w[1] - w[0];
                (change.max(0.0), (-change).max(0.0))
            })
            .unzip();

        let avg_gains = Self::wilder_smooth(&gains, self.period);
        let avg_losses = Self::wilder_smooth(&losses, self.period);

        avg_gains
            .iter()
            .zip(&avg_losses)
            .map(|(&gain, &loss)| {
                if loss == 0.0 {
                    100.0
                } else {
                    100.0 - 100.0 / (1.0 + gain / loss)
                }
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "RSI"
    }
}

/// MACD line, signal line and histogram at one point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdOutput {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Moving Average Convergence Divergence.
#[derive(Debug, Clone)]
pub struct Macd {
    fast: Ema,
    slow: Ema,
    signal: Ema,
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    /// MACD(12, 26, 9).
    pub fn new() -> Self {
        Self::with_periods(12, 26, 9)
    }

    /// Create a MACD with custom periods. `fast` is clamped below `slow`.
    pub fn with_periods(fast: usize, slow: usize, signal: usize) -> Self {
        let slow = slow.max(2);
        let fast = fast.clamp(1, slow - 1);
        let signal = signal.max(1);
        Self {
            fast: Ema::new(fast),
            slow: Ema::new(slow),
            signal: Ema::new(signal),
            fast_period: fast,
            slow_period: slow,
            signal_period: signal,
        }
    }

    /// MACD line alone, aligned to the end of `data`.
    pub fn line(&self, data: &[f64]) -> Vec<f64> {
        let fast = self.fast.calculate(data);
        let slow = self.slow.calculate(data);
        if slow.is_empty() {
            return vec![];
        }
        let offset = self.slow_period - self.fast_period;
        fast[offset..]
            .iter()
            .zip(&slow)
            .map(|(f, s)| f - s)
            .collect()
    }
}

impl Default for Macd {
    fn default() -> Self {
        Self::new()
    }
}

impl Indicator for Macd {
    type Output = MacdOutput;

    fn calculate(&self, data: &[f64]) -> Vec<MacdOutput> {
        let line = self.line(data);
        let signal = self.signal.calculate(&line);
        if signal.is_empty() {
            return vec![];
        }

        line[self.signal_period - 1..]
            .iter()
            .zip(&signal)
            .map(|(&macd, &signal)| MacdOutput {
                macd,
                signal,
                histogram: macd - signal,
            })
            .collect()
    }

    fn period(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    fn name(&self) -> &str {
        "MACD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_bounds() {
        let rsi = Rsi::new(14);
        let data: Vec<f64> = (0..60)
            .map(|i| 100.0 + (i as f64 * 0.5).sin() * 5.0)
            .collect();

        let result = rsi.calculate(&data);
        assert_eq!(result.len(), data.len() - 14);
        assert!(result.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_rsi_extremes() {
        let rsi = Rsi::new(5);
        let up = rsi.calculate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert!((up[0] - 100.0).abs() < 1e-10);

        let down = rsi.calculate(&[7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]);
        assert!(down[0].abs() < 1e-10);
    }

    #[test]
    fn test_macd_uptrend_positive() {
        let macd = Macd::new();
        let data: Vec<f64> = (0..80).map(|i| 100.0 + i as f64).collect();
        let result = macd.calculate(&data);

        assert_eq!(result.len(), data.len() - macd.period() + 1);
        assert!(result.last().unwrap().macd > 0.0);
    }

    #[test]
    fn test_macd_insufficient_data() {
        let macd = Macd::with_periods(5, 10, 3);
        assert!(macd.calculate(&[1.0; 11]).is_empty());
        assert_eq!(macd.calculate(&[1.0; 12]).len(), 1);
    }
}
