//! Entry signal that never fires.

use runner_core::{
    traits::{EntryDecision, EntrySignal},
    types::BarSeries,
};

/// Manage-only mode: the engine idles while flat.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSignal;

impl EntrySignal for NeverSignal {
    fn name(&self) -> &str {
        "never"
    }

    fn description(&self) -> &str {
        "Never enters"
    }

    fn evaluate(&self, _series: &BarSeries) -> EntryDecision {
        EntryDecision::none().with_reasons(vec!["never: disabled".into()])
    }

    fn warmup_period(&self) -> usize {
        0
    }
}
