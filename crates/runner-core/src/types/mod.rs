//! Core data types for the position runner.

mod event;
mod ohlcv;
mod order;
mod position;
mod timeframe;
mod venue;

pub use event::{ClosedTrade, Event};
pub use ohlcv::{decimal_price, Bar, BarSeries};
pub use order::{Direction, Fill, MarketOrder, OrderReport, OrderSizing, Side};
pub use position::{ExitReason, Position, VenuePosition};
pub use timeframe::Timeframe;
pub use venue::{MarginType, SymbolFilters, Venue};
