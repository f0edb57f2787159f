//! Core traits for the position runner.

mod exchange;
mod indicator;
mod notifier;
mod signal;

pub use exchange::Exchange;
pub use indicator::Indicator;
pub use notifier::Notifier;
pub use signal::{EntryDecision, EntrySignal, SignalConfig};
