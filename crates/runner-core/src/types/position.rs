//! The single position slot and how a position ends.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Direction;

/// The one open position the runner holds, if any.
///
/// Created only from a confirmed fill with positive quantity and dropped
/// only after a confirmed exit fill or an administrative flatten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub direction: Direction,
    /// Filled base quantity
    pub quantity: Decimal,
    /// Volume-weighted entry price
    pub entry_price: Decimal,
    /// Current stop level
    pub stop_price: Decimal,
    /// Best price seen since entry (highest for long, lowest for short)
    pub extreme_price: Decimal,
    pub entry_time: DateTime<Utc>,
    /// Latched once the target is hit quickly; never reverts
    pub fast_mode: bool,
    /// 1 on spot
    pub leverage: u32,
    /// Quote value at entry
    pub notional: Decimal,
}

impl Position {
    /// Create a freshly filled position in normal mode.
    pub fn open(
        symbol: impl Into<String>,
        direction: Direction,
        quantity: Decimal,
        entry_price: Decimal,
        stop_price: Decimal,
        entry_time: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            direction,
            quantity,
            entry_price,
            stop_price,
            extreme_price: entry_price,
            entry_time,
            fast_mode: false,
            leverage: 1,
            notional: quantity * entry_price,
        }
    }

    /// Set leverage for a futures position.
    pub fn with_leverage(mut self, leverage: u32) -> Self {
        self.leverage = leverage.max(1);
        self
    }

    pub fn is_long(&self) -> bool {
        self.direction.is_long()
    }

    /// Seconds held as of `now`.
    pub fn held_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_seconds()
    }

    /// Quote P&L if closed at `price`.
    pub fn pnl_at(&self, price: Decimal) -> Decimal {
        (price - self.entry_price) * self.quantity * self.direction.sign()
    }

    /// Price move in the holder's favour as a fraction of entry.
    pub fn return_at(&self, price: Decimal) -> Decimal {
        if self.entry_price.is_zero() {
            return Decimal::ZERO;
        }
        (price - self.entry_price) / self.entry_price * self.direction.sign()
    }
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Stop level crossed in normal mode
    Stop,
    /// Plain take-profit
    Target,
    /// Trailing stop touched in fast mode
    Trailing,
    /// Operator flatten
    Manual,
    /// Venue reports no exposure; the record was dropped without an order
    External,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ExitReason::Stop => "stop",
            ExitReason::Target => "target",
            ExitReason::Trailing => "trailing",
            ExitReason::Manual => "manual",
            ExitReason::External => "external",
        };
        f.write_str(s)
    }
}

/// Open exposure as reported by a futures venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenuePosition {
    pub symbol: String,
    pub direction: Direction,
    /// Absolute base quantity
    pub quantity: Decimal,
    pub entry_price: Decimal,
}
