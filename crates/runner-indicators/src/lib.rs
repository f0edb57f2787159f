//! Technical indicators used by the entry signals.
//!
//! Batch implementations over `&[f64]` slices. Every output vector is
//! aligned to the END of its input: the last output belongs to the last
//! input point, which is all the entry signals ever look at.
//! - Trend: EMA
//! - Momentum: RSI (Wilder), MACD
//! - Volatility and range: ATR, Donchian channel

pub mod channel;
pub mod momentum;
pub mod moving_average;
pub mod volatility;

pub use channel::{Donchian, DonchianOutput};
pub use momentum::{Macd, MacdOutput, Rsi};
pub use moving_average::Ema;
pub use volatility::Atr;

/// True when `fast` crossed above `slow` between the last two points.
///
/// Both series must be aligned to the same end.
pub fn crossed_over(fast: &[f64], slow: &[f64]) -> bool {
    match (last_two(fast), last_two(slow)) {
        (Some((fp, fc)), Some((sp, sc))) => fp < sp && fc > sc,
        _ => false,
    }
}

/// True when `fast` crossed below `slow` between the last two points.
pub fn crossed_under(fast: &[f64], slow: &[f64]) -> bool {
    match (last_two(fast), last_two(slow)) {
        (Some((fp, fc)), Some((sp, sc))) => fp > sp && fc < sc,
        _ => false,
    }
}

fn last_two(values: &[f64]) -> Option<(f64, f64)> {
    match values {
        [.., prev, cur] => Some((*prev, *cur)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crosses() {
        assert!(crossed_over(&[1.0, 3.0], &[2.0, 2.0]));
        assert!(!crossed_over(&[2.0, 3.0], &[2.0, 2.0]));
        assert!(crossed_under(&[5.0, 3.0, 1.0], &[2.0, 2.0]));
        assert!(!crossed_under(&[1.0], &[2.0]));
    }
}
