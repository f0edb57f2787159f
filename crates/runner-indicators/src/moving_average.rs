//! Moving averages.

use runner_core::traits::Indicator;

/// Exponential Moving Average (EMA).
///
/// Seeded with the simple mean of the first `period` values, so the output
/// has `len - period + 1` points.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    multiplier: f64,
}

impl Ema {
    /// Create a new EMA with the specified period.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            multiplier: 2.0 / (period as f64 + 1.0),
        }
    }
}

impl Indicator for Ema {
    type Output = f64;

    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period {
            return vec![];
        }

        let mut result = Vec::with_capacity(data.len() - self.period + 1);
        let mut ema = data[..self.period].iter().sum::<f64>() / self.period as f64;
        result.push(ema);

        for &price in &data[self.period..] {
            ema += (price - ema) * self.multiplier;
            result.push(ema);
        }

        result
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "EMA"
    }
}
