//! Indicator trait shared by everything the entry signals compute.

/// A technical indicator over a close (or high/low) column.
///
/// Outputs are aligned to the end of the input: the last output belongs to
/// the last bar. Too little input yields an empty vector, never an error.
pub trait Indicator: Send + Sync {
    /// One point of output: `f64` for EMA, RSI and ATR, a struct for MACD
    /// and Donchian.
    type Output;

    fn calculate(&self, data: &[f64]) -> Vec<Self::Output>;

    /// Bars needed before the first output exists.
    fn period(&self) -> usize;

    fn name(&self) -> &str;

    /// Value at the most recent bar.
    fn latest(&self, data: &[f64]) -> Option<Self::Output> {
        self.calculate(data).pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Close-to-close change over `lag` bars.
    struct Change {
        lag: usize,
    }

    impl Indicator for Change {
        type Output = f64;

        fn calculate(&self, data: &[f64]) -> Vec<f64> {
            data.iter()
                .zip(data.iter().skip(self.lag))
                .map(|(then, now)| now - then)
                .collect()
        }

        fn period(&self) -> usize {
            self.lag + 1
        }

        fn name(&self) -> &str {
            "change"
        }
    }

    #[test]
    fn test_latest_is_last_bar() {
        let change = Change { lag: 2 };
        assert_eq!(change.calculate(&[1.0, 2.0, 4.0, 7.0]), vec![3.0, 5.0]);
        assert_eq!(change.latest(&[1.0, 2.0, 4.0, 7.0]), Some(5.0));
        assert_eq!(change.latest(&[1.0, 2.0]), None);
    }
}
