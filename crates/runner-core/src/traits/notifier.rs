//! Notification sink trait.

use crate::types::Event;

/// Receives engine events. Must not block the tick path.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &Event);
}

impl<F> Notifier for F
where
    F: Fn(&Event) + Send + Sync,
{
    fn notify(&self, event: &Event) {
        self(event)
    }
}
