//! In-memory trade journal.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use runner_core::ClosedTrade;

/// Summary counters over the journal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JournalSummary {
    /// Total number of closed trades
    pub trades: usize,
    /// Number of winning trades
    pub wins: usize,
    /// Number of losing trades
    pub losses: usize,
    /// Trades closed from fast mode
    pub fast_exits: usize,
    pub realized_pnl: Decimal,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade
    pub avg_loss: Decimal,
}

impl JournalSummary {
    /// Generate a text summary.
    pub fn render(&self) -> String {
        let mut s = String::new();
        s.push_str("TRADES\n");
        s.push_str("───────────────────────────────────────────\n");
        s.push_str(&format!("  Closed:            {}\n", self.trades));
        s.push_str(&format!("  Wins / Losses:     {} / {}\n", self.wins, self.losses));
        s.push_str(&format!("  Fast-mode exits:   {}\n", self.fast_exits));
        s.push_str(&format!("  Win Rate:          {:.1}%\n", self.win_rate_pct));
        s.push_str(&format!("  Avg Win:           {:.2}\n", self.avg_win));
        s.push_str(&format!("  Avg Loss:          {:.2}\n", self.avg_loss));
        s.push_str(&format!("  Realized P&L:      {:.2}\n", self.realized_pnl));
        s
    }
}

/// Closed trades for this session. Lost on restart.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TradeJournal {
    trades: Vec<ClosedTrade>,
}

impl TradeJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trade record.
    pub fn record(&mut self, trade: ClosedTrade) {
        self.trades.push(trade);
    }

    pub fn trades(&self) -> &[ClosedTrade] {
        &self.trades
    }

    pub fn last(&self) -> Option<&ClosedTrade> {
        self.trades.last()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Calculate summary statistics.
    pub fn summary(&self) -> JournalSummary {
        let mut summary = JournalSummary {
            trades: self.trades.len(),
            ..Default::default()
        };

        let mut total_profit = Decimal::ZERO;
        let mut total_loss = Decimal::ZERO;
        for trade in &self.trades {
            summary.realized_pnl += trade.pnl;
            if trade.fast_mode {
                summary.fast_exits += 1;
            }
            if trade.pnl > Decimal::ZERO {
                summary.wins += 1;
                total_profit += trade.pnl;
            } else if trade.pnl < Decimal::ZERO {
                summary.losses += 1;
                total_loss += trade.pnl.abs();
            }
        }

        if summary.trades > 0 {
            summary.win_rate_pct =
                Decimal::from(summary.wins * 100) / Decimal::from(summary.trades);
        }
        if summary.wins > 0 {
            summary.avg_win = total_profit / Decimal::from(summary.wins);
        }
        if summary.losses > 0 {
            summary.avg_loss = total_loss / Decimal::from(summary.losses);
        }
        summary
    }

    /// Export trades as JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.trades)
    }
}
