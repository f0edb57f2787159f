//! Recent engine events for display.

use chrono::Utc;
use runner_core::{Event, Notifier};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// Bounded, shareable log of event summaries. Plugs in as a [`Notifier`].
#[derive(Debug, Clone)]
pub struct EventFeed {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity: capacity.max(1),
        }
    }

    pub fn push(&self, line: String) {
        let mut lines = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.len() == self.capacity {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Oldest first.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new(50)
    }
}

impl Notifier for EventFeed {
    fn notify(&self, event: &Event) {
        self.push(format!("{} {}", Utc::now().format("%H:%M:%S"), event.summary()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_is_bounded() {
        let feed = EventFeed::new(2);
        feed.notify(&Event::TradingEnabled);
        feed.notify(&Event::TradingDisabled);
        feed.notify(&Event::SymbolChanged {
            from: "BTCUSDT".into(),
            to: "ETHUSDT".into(),
        });

        let lines = feed.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("trading disabled"));
        assert!(lines[1].ends_with("symbol BTCUSDT -> ETHUSDT"));
    }
}
