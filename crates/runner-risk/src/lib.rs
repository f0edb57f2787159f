//! Risk math for the position runner.
//!
//! Provides allocation sizing for entries, per-symbol leverage, and the
//! stop / target / lock / trailing level arithmetic the state machine uses.

mod allocation;
mod leverage;
mod levels;

pub use allocation::{AllocationMode, AllocationPolicy, FuturesSizing};
pub use leverage::{LeverageMap, MAX_LEVERAGE};
pub use levels::{is_pumping, ratchet, ExitLevels};
