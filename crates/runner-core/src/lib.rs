//! Core types and traits for the position runner.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarSeries)
//! - Market orders, fills and the single-slot position record
//! - The error taxonomy shared by every tick
//! - Core traits for exchanges, entry signals, indicators and notification sinks

pub mod types;
pub mod traits;
pub mod error;

pub use error::{
    DataError, ErrorKind, ExchangeError, SignalError, TradingError, TradingResult,
};
pub use types::*;
pub use traits::*;
