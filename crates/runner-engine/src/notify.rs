//! Notification sinks.

use std::sync::Arc;
use tracing::{info, warn};
use runner_core::{Event, Notifier};

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: &Event) {
        match event {
            Event::Error { kind, message } => {
                warn!(kind = ?kind, message = %message, "Tick error");
            }
            Event::PositionClosed { trade } => info!(
                symbol = %trade.symbol,
                direction = %trade.direction,
                reason = %trade.reason,
                entry = %trade.entry_price,
                exit = %trade.exit_price,
                pnl = %trade.pnl,
                fast_mode = trade.fast_mode,
                "Position closed"
            ),
            other => info!(event = %other.summary(), "Engine event"),
        }
    }
}

/// Sends each event to every inner sink.
#[derive(Clone, Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    pub fn with(mut self, sink: Arc<dyn Notifier>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, event: &Event) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_fanout_reaches_every_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = {
            let seen = Arc::clone(&seen);
            move |e: &Event| seen.lock().unwrap().push(e.clone())
        };
        let fanout = FanoutNotifier::new()
            .with(Arc::new(TracingNotifier))
            .with(Arc::new(record));

        fanout.notify(&Event::TradingEnabled);
        fanout.notify(&Event::TradingDisabled);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Event::TradingEnabled, Event::TradingDisabled]
        );
    }
}
