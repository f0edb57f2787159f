//! The mutable trading context, owned by the tick driver.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use runner_core::{ErrorKind, Position, TradingError, Venue};
use runner_data::{MarketSnapshotCache, SnapshotSettings};

use crate::error::ControlError;
use crate::journal::{JournalSummary, TradeJournal};

/// All process state the engine mutates. Only the serial tick path and
/// control commands applied between ticks touch it.
#[derive(Debug)]
pub struct TradingContext {
    /// Symbol to enter on when flat
    pub symbol: String,
    /// The single position slot
    pub position: Option<Position>,
    pub trading_enabled: bool,
    /// Auto-shutdown already fired and was announced
    pub auto_shutdown_fired: bool,
    pub last_exit: Option<DateTime<Utc>>,
    pub session_start: DateTime<Utc>,
    pub cache: MarketSnapshotCache,
    pub journal: TradeJournal,
    pub last_error: Option<(DateTime<Utc>, TradingError)>,
    pub ticks: u64,
}

impl TradingContext {
    /// Fresh context. Trading starts disabled until enabled explicitly.
    pub fn new(symbol: impl Into<String>, snapshot: SnapshotSettings, now: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into().to_uppercase(),
            position: None,
            trading_enabled: false,
            auto_shutdown_fired: false,
            last_exit: None,
            session_start: now,
            cache: MarketSnapshotCache::new(snapshot),
            journal: TradeJournal::new(),
            last_error: None,
            ticks: 0,
        }
    }

    /// Start with trading enabled.
    pub fn enabled(mut self) -> Self {
        self.trading_enabled = true;
        self
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    /// Symbol the tick path works on: the held one, else the target.
    pub fn active_symbol(&self) -> &str {
        self.position
            .as_ref()
            .map_or(self.symbol.as_str(), |p| p.symbol.as_str())
    }

    /// Whether the post-exit cooldown is still running at `now`.
    pub fn cooldown_active(&self, now: DateTime<Utc>, cooldown_secs: i64) -> bool {
        self.last_exit
            .is_some_and(|exit| now - exit < Duration::seconds(cooldown_secs))
    }

    /// Switch the target symbol. Rejected while a position is open.
    pub fn set_symbol(&mut self, symbol: &str) -> Result<Option<String>, ControlError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ControlError::InvalidSymbol(symbol));
        }
        if let Some(pos) = &self.position {
            return Err(ControlError::PositionOpen(pos.symbol.clone()));
        }
        if symbol == self.symbol {
            return Ok(None);
        }
        let previous = std::mem::replace(&mut self.symbol, symbol);
        self.cache.invalidate();
        Ok(Some(previous))
    }
}

/// Point-in-time view for `get_status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub time: DateTime<Utc>,
    pub venue: Venue,
    pub exchange: String,
    pub symbol: String,
    /// Last close of the cached snapshot, whatever its age
    pub price: Option<Decimal>,
    pub snapshot_age_secs: Option<i64>,
    pub position: Option<Position>,
    pub unrealized_pnl: Option<Decimal>,
    pub trading_enabled: bool,
    pub leverage: u32,
    pub cooldown_remaining_secs: i64,
    pub journal: JournalSummary,
    pub last_error: Option<(ErrorKind, String)>,
    pub ticks: u64,
}

impl StatusSnapshot {
    /// Multi-line human summary.
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str(&format!(
            "{} {} | {} | trading {}\n",
            self.exchange,
            self.venue,
            self.symbol,
            if self.trading_enabled { "ON" } else { "OFF" }
        ));
        match self.price {
            Some(price) => s.push_str(&format!(
                "price {} (age {}s)\n",
                price,
                self.snapshot_age_secs.unwrap_or_default()
            )),
            None => s.push_str("price n/a\n"),
        }
        match &self.position {
            Some(p) => s.push_str(&format!(
                "{} {} qty {} entry {} stop {} extreme {} fast {} lev {}x pnl {}\n",
                p.direction,
                p.symbol,
                p.quantity,
                p.entry_price,
                p.stop_price,
                p.extreme_price,
                p.fast_mode,
                p.leverage,
                self.unrealized_pnl
                    .map_or_else(|| "n/a".to_string(), |v| format!("{:.2}", v)),
            )),
            None if self.cooldown_remaining_secs > 0 => s.push_str(&format!(
                "flat, cooldown {}s\n",
                self.cooldown_remaining_secs
            )),
            None => s.push_str("flat\n"),
        }
        if let Some((kind, message)) = &self.last_error {
            s.push_str(&format!("last error {:?}: {}\n", kind, message));
        }
        s.push_str(&self.journal.render());
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use runner_core::Direction;
    use rust_decimal_macros::dec;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cooldown() {
        let mut ctx = TradingContext::new("BTCUSDT", SnapshotSettings::default(), t0());
        assert!(!ctx.cooldown_active(t0(), 60));
        ctx.last_exit = Some(t0());
        assert!(ctx.cooldown_active(t0() + Duration::seconds(59), 60));
        assert!(!ctx.cooldown_active(t0() + Duration::seconds(60), 60));
    }

    #[test]
    fn test_set_symbol_only_when_flat() {
        let mut ctx = TradingContext::new("BTCUSDT", SnapshotSettings::default(), t0());
        assert_eq!(ctx.set_symbol("ethusdt").unwrap(), Some("BTCUSDT".to_string()));
        assert_eq!(ctx.symbol, "ETHUSDT");
        assert_eq!(ctx.set_symbol("ETHUSDT").unwrap(), None);
        assert!(matches!(ctx.set_symbol("ETH/USDT"), Err(ControlError::InvalidSymbol(_))));

        ctx.position = Some(Position::open(
            "ETHUSDT",
            Direction::Long,
            dec!(1),
            dec!(100),
            dec!(99),
            t0(),
        ));
        assert!(matches!(
            ctx.set_symbol("SOLUSDT"),
            Err(ControlError::PositionOpen(_))
        ));
        assert_eq!(ctx.symbol, "ETHUSDT");
    }

    #[test]
    fn test_active_symbol_follows_position() {
        let mut ctx = TradingContext::new("BTCUSDT", SnapshotSettings::default(), t0());
        ctx.position = Some(Position::open(
            "SOLUSDT",
            Direction::Long,
            dec!(1),
            dec!(100),
            dec!(99),
            t0(),
        ));
        assert_eq!(ctx.active_symbol(), "SOLUSDT");
    }
}
