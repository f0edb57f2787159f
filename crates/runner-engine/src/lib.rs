//! Position lifecycle engine.
//!
//! One serial tick over a [`TradingContext`]: refresh the market snapshot,
//! manage the open position through the [`PositionMachine`], then look for
//! an entry. The [`Scheduler`] drives ticks and applies control commands
//! between them.

mod config;
mod context;
mod engine;
mod error;
mod execution;
mod journal;
mod machine;
mod notify;
mod scheduler;

pub use config::EngineConfig;
pub use context::{StatusSnapshot, TradingContext};
pub use engine::{TickAction, TradingEngine};
pub use error::ControlError;
pub use execution::{EntryFill, ExecutionAdapter, ExitFill};
pub use journal::{JournalSummary, TradeJournal};
pub use machine::{MarketTick, PositionMachine, Step};
pub use notify::{FanoutNotifier, TracingNotifier};
pub use scheduler::{
    ControlCommand, ControlHandle, FixedSymbol, Scheduler, SchedulerConfig, SymbolRanker,
};
