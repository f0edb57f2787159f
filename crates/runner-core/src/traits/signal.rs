//! Entry signal trait definitions.

use crate::error::SignalError;
use crate::types::{BarSeries, Direction};
use serde::{Deserialize, Serialize};

/// Configuration trait for entry signals.
pub trait SignalConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), SignalError>;
}

/// Outcome of evaluating an entry signal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryDecision {
    /// Direction to enter, if the signal fired
    pub direction: Option<Direction>,
    /// Human-readable reasons, collected whether or not it fired
    pub reasons: Vec<String>,
}

impl EntryDecision {
    /// A decision that does not fire.
    pub fn none() -> Self {
        Self::default()
    }

    /// A decision that fires in `direction`.
    pub fn enter(direction: Direction, reasons: Vec<String>) -> Self {
        Self {
            direction: Some(direction),
            reasons,
        }
    }

    /// Attach reasons to a decision.
    pub fn with_reasons(mut self, reasons: Vec<String>) -> Self {
        self.reasons = reasons;
        self
    }

    pub fn fired(&self) -> bool {
        self.direction.is_some()
    }
}

/// Pure predicate over a candle series.
///
/// Implementations hold no per-call state, so one instance is shared by the
/// tick path and the `signals` command alike.
pub trait EntrySignal: Send + Sync {
    /// Get the unique name of this signal.
    fn name(&self) -> &str;

    /// Evaluate the series and decide whether to enter.
    ///
    /// # Arguments
    /// * `series` - 1-minute candles, oldest first
    fn evaluate(&self, series: &BarSeries) -> EntryDecision;

    /// Number of candles needed before the signal can fire.
    fn warmup_period(&self) -> usize;

    /// Check if enough candles are available.
    fn is_warmed_up(&self, bars_available: usize) -> bool {
        bars_available >= self.warmup_period()
    }

    /// Get a description of the signal.
    fn description(&self) -> &str {
        ""
    }
}
