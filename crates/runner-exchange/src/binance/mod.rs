//! Binance Spot and USDT-M Futures REST adapters.

mod client;
mod futures;
mod spot;
mod wire;

pub use client::{BinanceCredentials, BinanceSettings};
pub use futures::BinanceFutures;
pub use spot::BinanceSpot;
