//! Voting combination of the individual entry signals.
//!
//! Each member votes LONG, SHORT or abstains. The combination fires when
//! one side collects at least `min_votes` and strictly more votes than the
//! other side. Reasons from every member are kept, fired or not.

use runner_core::{
    error::SignalError,
    traits::{EntryDecision, EntrySignal, SignalConfig},
    types::{BarSeries, Direction},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    BreakoutAtrConfig, BreakoutAtrSignal, EmaCrossConfig, EmaCrossSignal, RsiMacdConfig,
    RsiMacdSignal,
};

/// Configuration for the combined signal.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CombinedConfig {
    /// Votes one side needs before the combination fires
    pub min_votes: usize,
    pub rsi_macd: RsiMacdConfig,
    pub ema_cross: EmaCrossConfig,
    pub breakout: BreakoutAtrConfig,
}

impl Default for CombinedConfig {
    fn default() -> Self {
        Self {
            min_votes: 2,
            rsi_macd: RsiMacdConfig::default(),
            ema_cross: EmaCrossConfig::default(),
            breakout: BreakoutAtrConfig::default(),
        }
    }
}

impl SignalConfig for CombinedConfig {
    fn validate(&self) -> Result<(), SignalError> {
        if self.min_votes == 0 || self.min_votes > 3 {
            return Err(SignalError::InvalidConfig(
                "min_votes must be between 1 and 3".into(),
            ));
        }
        self.rsi_macd.validate()?;
        self.ema_cross.validate()?;
        self.breakout.validate()
    }
}

/// Production entry signal.
pub struct CombinedSignal {
    min_votes: usize,
    members: Vec<Box<dyn EntrySignal>>,
}

impl CombinedSignal {
    pub fn new(config: CombinedConfig) -> Self {
        Self::with_members(
            config.min_votes,
            vec![
                Box::new(RsiMacdSignal::new(config.rsi_macd)),
                Box::new(EmaCrossSignal::new(config.ema_cross)),
                Box::new(BreakoutAtrSignal::new(config.breakout)),
            ],
        )
    }

    /// Combine arbitrary members.
    pub fn with_members(min_votes: usize, members: Vec<Box<dyn EntrySignal>>) -> Self {
        Self {
            min_votes: min_votes.max(1),
            members,
        }
    }
}

impl Default for CombinedSignal {
    fn default() -> Self {
        Self::new(CombinedConfig::default())
    }
}

impl EntrySignal for CombinedSignal {
    fn name(&self) -> &str {
        "combined"
    }

    fn description(&self) -> &str {
        "Majority vote of rsi_macd, ema_cross and breakout_atr"
    }

    fn evaluate(&self, series: &BarSeries) -> EntryDecision {
        let mut long_votes = 0;
        let mut short_votes = 0;
        let mut reasons = Vec::new();

        for member in &self.members {
            let decision = member.evaluate(series);
            match decision.direction {
                Some(Direction::Long) => long_votes += 1,
                Some(Direction::Short) => short_votes += 1,
                None => {}
            }
            reasons.extend(decision.reasons);
        }

        debug!(
            symbol = %series.symbol,
            long_votes,
            short_votes,
            min_votes = self.min_votes,
            "Combined signal votes"
        );

        if long_votes >= self.min_votes && long_votes > short_votes {
            reasons.push(format!("combined: {} LONG votes", long_votes));
            return EntryDecision::enter(Direction::Long, reasons);
        }
        if short_votes >= self.min_votes && short_votes > long_votes {
            reasons.push(format!("combined: {} SHORT votes", short_votes));
            return EntryDecision::enter(Direction::Short, reasons);
        }

        reasons.push("combined: not enough agreement".into());
        EntryDecision::none().with_reasons(reasons)
    }

    fn warmup_period(&self) -> usize {
        self.members
            .iter()
            .map(|m| m.warmup_period())
            .max()
            .unwrap_or(0)
    }
}
