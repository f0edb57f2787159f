//! Venue kind, margin mode and per-symbol trading filters.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which market the runner trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Venue {
    #[default]
    Spot,
    /// USDT-margined perpetual futures
    Futures,
}

impl Venue {
    pub fn is_futures(&self) -> bool {
        matches!(self, Venue::Futures)
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Spot => write!(f, "spot"),
            Venue::Futures => write!(f, "futures"),
        }
    }
}

impl FromStr for Venue {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "spot" => Ok(Venue::Spot),
            "futures" | "usdm" | "perp" => Ok(Venue::Futures),
            _ => Err(format!("Invalid venue: {}", s)),
        }
    }
}

/// Futures margin mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarginType {
    #[default]
    Isolated,
    Crossed,
}

impl MarginType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarginType::Isolated => "ISOLATED",
            MarginType::Crossed => "CROSSED",
        }
    }
}

/// Trading filters for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SymbolFilters {
    /// Minimum order value in quote currency
    pub min_notional: Decimal,
    /// Quantity increment (0 = unrestricted)
    pub step_size: Decimal,
    /// Price increment (0 = unrestricted)
    pub tick_size: Decimal,
    pub min_qty: Decimal,
}

impl Default for SymbolFilters {
    fn default() -> Self {
        Self {
            min_notional: dec!(5),
            step_size: Decimal::ZERO,
            tick_size: Decimal::ZERO,
            min_qty: Decimal::ZERO,
        }
    }
}

impl SymbolFilters {
    /// Round a quantity down to the step size.
    pub fn floor_qty(&self, quantity: Decimal) -> Decimal {
        floor_to_increment(quantity, self.step_size)
    }

    /// Round a price down to the tick size.
    pub fn floor_price(&self, price: Decimal) -> Decimal {
        floor_to_increment(price, self.tick_size)
    }

    /// Whether `quantity` at `price` clears the minimum quantity and notional.
    pub fn accepts(&self, quantity: Decimal, price: Decimal) -> bool {
        quantity > Decimal::ZERO
            && quantity >= self.min_qty
            && quantity * price >= self.min_notional
    }
}

fn floor_to_increment(value: Decimal, increment: Decimal) -> Decimal {
    if increment <= Decimal::ZERO {
        return value;
    }
    let steps = (value / increment).round_dp_with_strategy(0, RoundingStrategy::ToZero);
    (steps * increment).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_qty_to_step() {
        let filters = SymbolFilters {
            step_size: dec!(0.001),
            ..Default::default()
        };
        assert_eq!(filters.floor_qty(dec!(0.12345)), dec!(0.123));
        assert_eq!(filters.floor_qty(dec!(0.0009)), Decimal::ZERO);

        let unrestricted = SymbolFilters::default();
        assert_eq!(unrestricted.floor_qty(dec!(0.12345)), dec!(0.12345));
    }

    #[test]
    fn test_accepts_min_notional() {
        let filters = SymbolFilters {
            min_notional: dec!(5),
            min_qty: dec!(0.001),
            ..Default::default()
        };
        assert!(filters.accepts(dec!(0.1), dec!(100)));
        assert!(!filters.accepts(dec!(0.01), dec!(100)));
        assert!(!filters.accepts(dec!(0.0005), dec!(100_000)));
    }

    #[test]
    fn test_venue_parse() {
        assert_eq!("FUTURES".parse::<Venue>().unwrap(), Venue::Futures);
        assert!("margin".parse::<Venue>().is_err());
    }
}
