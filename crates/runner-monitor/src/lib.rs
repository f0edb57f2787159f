//! Logging setup, event feed and terminal status dashboard.

mod dashboard;
mod feed;
mod logging;

pub use dashboard::{Dashboard, DashboardState};
pub use feed::EventFeed;
pub use logging::setup_logging;
