//! Control surface errors.

use runner_core::TradingError;
use thiserror::Error;

/// Why a control request was refused.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    #[error("A position is open on {0}; close it first")]
    PositionOpen(String),

    #[error("Invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("No open position")]
    NoPosition,

    #[error("Engine is not running")]
    EngineStopped,

    #[error(transparent)]
    Trading(#[from] TradingError),
}
