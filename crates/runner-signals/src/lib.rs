//! Entry signal implementations.
//!
//! Every signal is a pure predicate over a 1-minute candle series:
//! - RSI + MACD reversal with an EMA trend filter
//! - EMA crossover with an EMA trend filter
//! - Donchian breakout gated on ATR
//! - A voting combination of the three (the production signal)
//! - A signal that never fires

mod breakout;
mod combined;
mod ema_cross;
mod never;
mod registry;
mod rsi_macd;

pub use breakout::{BreakoutAtrConfig, BreakoutAtrSignal};
pub use combined::{CombinedConfig, CombinedSignal};
pub use ema_cross::{EmaCrossConfig, EmaCrossSignal};
pub use never::NeverSignal;
pub use registry::{SignalInfo, SignalRegistry};
pub use rsi_macd::{RsiMacdConfig, RsiMacdSignal};

#[cfg(test)]
pub(crate) mod test_util {
    use runner_core::types::{Bar, BarSeries, Timeframe};

    /// Series of flat candles (open = high = low = close).
    pub fn flat_series(closes: &[f64]) -> BarSeries {
        BarSeries::from_closes("TESTUSDT", 0, closes)
    }

    /// Series with a fixed half-spread around every close.
    pub fn ranged_series(closes: &[f64], half_range: f64) -> BarSeries {
        let mut series = BarSeries::new("TESTUSDT", Timeframe::Minute1);
        for (i, &c) in closes.iter().enumerate() {
            series.push(Bar::new(
                i as i64 * 60_000,
                c,
                c + half_range,
                c - half_range,
                c,
                1.0,
            ));
        }
        series
    }
}
