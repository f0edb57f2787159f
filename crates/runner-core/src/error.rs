//! Error types for the position runner.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy every tick branches on.
///
/// None of these are fatal once the scheduler is running; only
/// [`TradingError::Configuration`] aborts, and only at startup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TradingError {
    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Insufficient balance: required {required}, available {available}")]
    InsufficientBalance { required: Decimal, available: Decimal },

    #[error("Venue rejected order: {0}")]
    VenueRejected(String),

    #[error("Network failure: {0}")]
    NetworkFailure(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Discriminant of [`TradingError`], for branching and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DataUnavailable,
    InsufficientBalance,
    VenueRejected,
    NetworkFailure,
    Configuration,
}

impl TradingError {
    /// Get the taxonomy kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TradingError::DataUnavailable(_) => ErrorKind::DataUnavailable,
            TradingError::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            TradingError::VenueRejected(_) => ErrorKind::VenueRejected,
            TradingError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            TradingError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Whether an order may have reached the venue.
    ///
    /// Rejections and network failures are treated identically for state
    /// purposes: the position record is left exactly as it was.
    pub fn is_order_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::VenueRejected | ErrorKind::NetworkFailure
        )
    }
}

/// Errors returned by exchange adapters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExchangeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    #[error("Order rejected: {0}")]
    OrderRejected(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("No data available: {0}")]
    NoData(String),
}

impl From<ExchangeError> for TradingError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Configuration(msg) | ExchangeError::Authentication(msg) => {
                TradingError::Configuration(msg)
            }
            ExchangeError::Connection(msg) | ExchangeError::Timeout(msg) => {
                TradingError::NetworkFailure(msg)
            }
            ExchangeError::NoData(msg) => TradingError::DataUnavailable(msg),
            other => TradingError::VenueRejected(other.to_string()),
        }
    }
}

/// Candle data loading errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("No data available")]
    NoDataAvailable,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl From<DataError> for TradingError {
    fn from(err: DataError) -> Self {
        TradingError::DataUnavailable(err.to_string())
    }
}

/// Entry signal errors.
#[derive(Error, Debug)]
pub enum SignalError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Entry signal not found: {0}")]
    NotFound(String),
}

/// Result type alias for trading operations.
pub type TradingResult<T> = Result<T, TradingError>;
