//! How much quote currency an entry may spend.

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;
use runner_core::{SymbolFilters, TradingError, TradingResult};

/// Allocation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AllocationMode {
    /// Whole free balance minus the reserve
    #[default]
    All,
    /// A fixed quote amount per entry
    Fixed,
    /// A fraction of the free balance
    Percent,
}

/// Allocation policy for entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationPolicy {
    pub mode: AllocationMode,
    /// Quote amount for `fixed` mode
    pub fixed_quote: Decimal,
    /// Fraction of free balance for `percent` mode (0.25 = 25 %)
    pub percent: Decimal,
    /// Quote kept aside in `all` mode
    pub reserve: Decimal,
    /// Upper bound per entry; 0 disables
    pub hard_cap: Decimal,
    /// Fraction of free balance never spent, leaves room for fees
    pub headroom: Decimal,
}

impl Default for AllocationPolicy {
    fn default() -> Self {
        Self {
            mode: AllocationMode::All,
            fixed_quote: dec!(50),
            percent: dec!(0.25),
            reserve: Decimal::ZERO,
            hard_cap: Decimal::ZERO,
            headroom: dec!(0.02),
        }
    }
}

/// A leveraged entry, sized and rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuturesSizing {
    /// Margin committed
    pub quote: Decimal,
    /// Base quantity, rounded down to the step size
    pub quantity: Decimal,
    /// quantity x price
    pub notional: Decimal,
}

impl AllocationPolicy {
    /// Create a fixed-amount policy.
    pub fn fixed(amount: Decimal) -> Self {
        Self {
            mode: AllocationMode::Fixed,
            fixed_quote: amount,
            ..Default::default()
        }
    }

    /// Create a percent-of-free-balance policy.
    pub fn percent(fraction: Decimal) -> Self {
        Self {
            mode: AllocationMode::Percent,
            percent: fraction,
            ..Default::default()
        }
    }

    /// Set the hard cap.
    pub fn with_hard_cap(mut self, cap: Decimal) -> Self {
        self.hard_cap = cap;
        self
    }

    /// Set the reserve kept out of `all` mode.
    pub fn with_reserve(mut self, reserve: Decimal) -> Self {
        self.reserve = reserve;
        self
    }

    /// Check the policy for nonsense values.
    pub fn validate(&self) -> Result<(), String> {
        if self.fixed_quote < Decimal::ZERO
            || self.reserve < Decimal::ZERO
            || self.hard_cap < Decimal::ZERO
        {
            return Err("allocation amounts must be non-negative".into());
        }
        if self.percent <= Decimal::ZERO || self.percent > Decimal::ONE {
            return Err("allocation percent must be in (0, 1]".into());
        }
        if self.headroom < Decimal::ZERO || self.headroom >= Decimal::ONE {
            return Err("allocation headroom must be in [0, 1)".into());
        }
        Ok(())
    }

    /// Quote amount to commit given the free balance, rounded down to cents.
    ///
    /// Desired amount per mode, clamped to `free * (1 - headroom)` and then to
    /// the hard cap. Never negative.
    pub fn quote_to_spend(&self, free: Decimal) -> Decimal {
        let free = free.max(Decimal::ZERO);
        let desired = match self.mode {
            AllocationMode::All => free - self.reserve,
            AllocationMode::Fixed => self.fixed_quote,
            AllocationMode::Percent => free * self.percent,
        };

        let mut quote = desired.min(free * (Decimal::ONE - self.headroom));
        if self.hard_cap > Decimal::ZERO {
            quote = quote.min(self.hard_cap);
        }

        quote
            .max(Decimal::ZERO)
            .round_dp_with_strategy(2, RoundingStrategy::ToZero)
    }

    /// Size a spot market buy in quote currency.
    ///
    /// Fails with `InsufficientBalance` when the amount is under the venue
    /// minimum notional; no order should be sent then.
    pub fn size_spot(&self, free: Decimal, filters: &SymbolFilters) -> TradingResult<Decimal> {
        let quote = self.quote_to_spend(free);
        debug!(%free, %quote, min_notional = %filters.min_notional, "Sized spot entry");

        if quote <= Decimal::ZERO || quote < filters.min_notional {
            return Err(TradingError::InsufficientBalance {
                required: filters.min_notional,
                available: quote,
            });
        }
        Ok(quote)
    }

    /// Size a leveraged futures entry in base quantity.
    pub fn size_futures(
        &self,
        free: Decimal,
        price: Decimal,
        leverage: u32,
        filters: &SymbolFilters,
    ) -> TradingResult<FuturesSizing> {
        if price <= Decimal::ZERO {
            return Err(TradingError::DataUnavailable(
                "no positive price to size against".into(),
            ));
        }

        let quote = self.quote_to_spend(free);
        let raw_qty = quote * Decimal::from(leverage.max(1)) / price;
        let quantity = filters.floor_qty(raw_qty).max(Decimal::ZERO);
        let notional = quantity * price;
        debug!(%free, %quote, leverage, %quantity, %notional, "Sized futures entry");

        if !filters.accepts(quantity, price) {
            return Err(TradingError::InsufficientBalance {
                required: filters.min_notional,
                available: notional,
            });
        }

        Ok(FuturesSizing {
            quote,
            quantity,
            notional,
        })
    }
}
