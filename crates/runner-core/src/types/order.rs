//! Market order requests and the execution reports that come back.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Get the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    /// Wire name used by the exchange.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a held position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// Side of the order that opens this direction.
    pub fn entry_side(&self) -> Side {
        match self {
            Direction::Long => Side::Buy,
            Direction::Short => Side::Sell,
        }
    }

    /// Side of the order that closes this direction.
    pub fn exit_side(&self) -> Side {
        self.entry_side().opposite()
    }

    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Direction::Long)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// How a market order is sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSizing {
    /// Spend this much quote currency (spot buys only).
    Quote(Decimal),
    /// Trade this much base currency.
    Base(Decimal),
}

/// Immediate market order, the only order type the runner sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOrder {
    pub symbol: String,
    pub side: Side,
    pub sizing: OrderSizing,
    /// Futures only: the order may only shrink existing exposure.
    pub reduce_only: bool,
    pub client_order_id: Option<String>,
}

impl MarketOrder {
    /// Quote-sized market order.
    pub fn quote(symbol: impl Into<String>, side: Side, quote_amount: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            sizing: OrderSizing::Quote(quote_amount),
            reduce_only: false,
            client_order_id: None,
        }
    }

    /// Base-sized market order.
    pub fn base(symbol: impl Into<String>, side: Side, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            sizing: OrderSizing::Base(quantity),
            reduce_only: false,
            client_order_id: None,
        }
    }

    /// Mark the order reduce-only.
    pub fn reduce_only(mut self) -> Self {
        self.reduce_only = true;
        self
    }

    /// Set a client order ID.
    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// A single execution within an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub price: Decimal,
    pub quantity: Decimal,
    pub commission: Decimal,
    pub commission_asset: Option<String>,
}

impl Fill {
    pub fn new(price: Decimal, quantity: Decimal) -> Self {
        Self {
            price,
            quantity,
            commission: Decimal::ZERO,
            commission_asset: None,
        }
    }
}

/// What the venue reported back for a submitted market order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub order_id: String,
    pub client_order_id: Option<String>,
    /// Aggregate executed base quantity.
    pub executed_qty: Decimal,
    /// Aggregate average price, when the venue provides one.
    pub avg_price: Option<Decimal>,
    /// Individual fills; spot responses carry them, futures usually do not.
    pub fills: Vec<Fill>,
}

impl OrderReport {
    /// Executed quantity: the fill sum when fills exist, else the aggregate.
    pub fn filled_quantity(&self) -> Decimal {
        if self.fills.is_empty() {
            self.executed_qty
        } else {
            self.fills.iter().map(|f| f.quantity).sum()
        }
    }

    /// Volume-weighted price across fills, if any fill has quantity.
    pub fn vwap(&self) -> Option<Decimal> {
        let qty: Decimal = self.fills.iter().map(|f| f.quantity).sum();
        if qty <= Decimal::ZERO {
            return None;
        }
        let value: Decimal = self.fills.iter().map(|f| f.price * f.quantity).sum();
        Some(value / qty)
    }

    /// Fill price: VWAP over fills, else the reported average, else `fallback`.
    pub fn fill_price(&self, fallback: Decimal) -> Decimal {
        self.vwap()
            .or(self.avg_price.filter(|p| *p > Decimal::ZERO))
            .unwrap_or(fallback)
    }
}
