//! Donchian price channel.

use runner_core::traits::Indicator;
use serde::{Deserialize, Serialize};

/// Channel bounds over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DonchianOutput {
    pub upper: f64,
    pub lower: f64,
}

impl DonchianOutput {
    pub fn middle(&self) -> f64 {
        (self.upper + self.lower) / 2.0
    }
}

/// Highest high and lowest low over the last `period` bars.
#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
}

impl Donchian {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Channel from separate high and low columns.
    pub fn calculate_hl(&self, high: &[f64], low: &[f64]) -> Vec<DonchianOutput> {
        let len = high.len().min(low.len());
        if len < self.period {
            return vec![];
        }
        let (high, low) = (&high[high.len() - len..], &low[low.len() - len..]);

        high.windows(self.period)
            .zip(low.windows(self.period))
            .map(|(h, l)| DonchianOutput {
                upper: h.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                lower: l.iter().copied().fold(f64::INFINITY, f64::min),
            })
            .collect()
    }
}

impl Indicator for Donchian {
    type Output = DonchianOutput;

    /// Channel over closes only.
    fn calculate(&self, data: &[f64]) -> Vec<DonchianOutput> {
        self.calculate_hl(data, data)
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "Donchian"
    }
}
