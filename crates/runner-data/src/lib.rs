//! Market data for the position runner.
//!
//! - [`MarketSnapshotCache`]: the latest 1-minute series for the symbol being
//!   traded, refreshed at most once per wall-clock minute
//! - [`CsvCandleSource`]: candles from CSV files, used for paper replay

mod csv_source;
mod snapshot;

pub use csv_source::CsvCandleSource;
pub use snapshot::{MarketSnapshot, MarketSnapshotCache, SnapshotSettings};

use runner_core::error::DataError;
use runner_core::types::Bar;
use std::path::Path;

/// Load candles from a CSV file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<Vec<Bar>, DataError> {
    CsvCandleSource::new(path)?.load_all()
}
