//! Volatility indicators.

use runner_core::traits::Indicator;

/// Average True Range with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self {
            period: period.max(1),
        }
    }

    /// Calculate ATR from high/low/close columns.
    pub fn calculate_ohlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
        let len = high.len().min(low.len()).min(close.len());
        if len < self.period + 1 {
            return vec![];
        }

        let tr: Vec<f64> = (1..len)
            .map(|i| {
                let high_low = high[i] - low[i];
                let high_close = (high[i] - close[i - 1]).abs();
                let low_close = (low[i] - close[i - 1]).abs();
                high_low.max(high_close).max(low_close)
            })
            .collect();

        self.smooth(&tr)
    }

    fn smooth(&self, tr: &[f64]) -> Vec<f64> {
        if tr.len() < self.period {
            return vec![];
        }
        let n = self.period as f64;
        let mut atr = tr[..self.period].iter().sum::<f64>() / n;
        let mut result = Vec::with_capacity(tr.len() - self.period + 1);
        result.push(atr);
        for &value in &tr[self.period..] {
            atr = (atr * (n - 1.0) + value) / n;
            result.push(atr);
        }
        result
    }
}

impl Indicator for Atr {
    type Output = f64;

    /// Close-only approximation: true range is the absolute close change.
    fn calculate(&self, data: &[f64]) -> Vec<f64> {
        if data.len() < self.period + 1 {
            return vec![];
        }
        let tr: Vec<f64> = data.windows(2).map(|w| (w[1] - w[0]).abs()).collect();
        self.smooth(&tr)
    }

    fn period(&self) -> usize {
        self.period + 1
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_ohlc() {
        let atr = Atr::new(3);
        let high = [10.0, 11.0, 12.0, 13.0, 14.0];
        let low = [9.0, 10.0, 11.0, 12.0, 13.0];
        let close = [9.5, 10.5, 11.5, 12.5, 13.5];

        let result = atr.calculate_ohlc(&high, &low, &close);
        assert_eq!(result.len(), 2);
        // every true range is high - prev close = 1.5
        assert!((result[0] - 1.5).abs() < 1e-10);
        assert!((result[1] - 1.5).abs() < 1e-10);
    }

    #[test]
    fn test_atr_close_only() {
        let atr = Atr::new(2);
        let result = atr.calculate(&[1.0, 2.0, 4.0]);
        assert_eq!(result, vec![1.5]);
    }
}
