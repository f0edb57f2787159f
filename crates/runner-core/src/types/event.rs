//! Events the engine reports to the notification sink.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Direction, ExitReason, Position};
use crate::error::ErrorKind;

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub reason: ExitReason,
    pub fast_mode: bool,
    pub pnl: Decimal,
}

impl ClosedTrade {
    /// Close `position` at `exit_price`.
    pub fn from_position(
        position: &Position,
        exit_price: Decimal,
        exit_time: DateTime<Utc>,
        reason: ExitReason,
    ) -> Self {
        Self {
            symbol: position.symbol.clone(),
            direction: position.direction,
            quantity: position.quantity,
            entry_price: position.entry_price,
            exit_price,
            entry_time: position.entry_time,
            exit_time,
            reason,
            fast_mode: position.fast_mode,
            pnl: position.pnl_at(exit_price),
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// Something worth telling the operator about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    TradingEnabled,
    TradingDisabled,
    /// Auto-shutdown horizon reached; no further entries.
    AutoShutdown { after_days: u32 },
    SymbolChanged { from: String, to: String },
    PositionOpened {
        position: Position,
        reasons: Vec<String>,
    },
    FastModeActivated {
        symbol: String,
        price: Decimal,
        stop_price: Decimal,
    },
    PositionClosed { trade: ClosedTrade },
    /// An entry signal fired but no order was sent.
    EntrySkipped { symbol: String, reason: String },
    Error { kind: ErrorKind, message: String },
}

impl Event {
    /// One-line human summary.
    pub fn summary(&self) -> String {
        match self {
            Event::TradingEnabled => "trading enabled".to_string(),
            Event::TradingDisabled => "trading disabled".to_string(),
            Event::AutoShutdown { after_days } => {
                format!("auto-shutdown after {} days, no new entries", after_days)
            }
            Event::SymbolChanged { from, to } => format!("symbol {} -> {}", from, to),
            Event::PositionOpened { position, reasons } => format!(
                "opened {} {} qty {} @ {} stop {} ({})",
                position.direction,
                position.symbol,
                position.quantity,
                position.entry_price,
                position.stop_price,
                reasons.join("; ")
            ),
            Event::FastModeActivated {
                symbol,
                price,
                stop_price,
            } => format!("{} fast mode at {}, stop locked {}", symbol, price, stop_price),
            Event::PositionClosed { trade } => format!(
                "closed {} {} @ {} reason {} pnl {}",
                trade.direction, trade.symbol, trade.exit_price, trade.reason, trade.pnl
            ),
            Event::EntrySkipped { symbol, reason } => {
                format!("entry on {} skipped: {}", symbol, reason)
            }
            Event::Error { kind, message } => format!("{:?}: {}", kind, message),
        }
    }
}
