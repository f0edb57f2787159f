//! Exchange adapters.
//!
//! Every adapter implements [`runner_core::Exchange`]. The Binance adapters
//! sign requests with HMAC-SHA256, correct for server clock offset and send
//! each request exactly once with a fixed timeout. [`PaperExchange`] keeps
//! balances and positions in memory and fills at the last known close.

pub mod binance;
mod paper;

pub use binance::{BinanceCredentials, BinanceFutures, BinanceSettings, BinanceSpot};
pub use paper::PaperExchange;
