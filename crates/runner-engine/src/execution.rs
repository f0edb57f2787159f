//! Execution adapter: one venue-legal market order per intent.
//!
//! Sizing and rounding happen here, before anything is sent. Each intent is
//! submitted exactly once; a failure surfaces as a typed error and the
//! caller's position record is left alone.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;
use runner_core::{
    Direction, Exchange, MarginType, MarketOrder, OrderReport, Position, Side, TradingError,
    TradingResult, Venue,
};
use runner_risk::{AllocationPolicy, LeverageMap};

/// A confirmed entry fill.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    pub direction: Direction,
    pub quantity: Decimal,
    /// Volume-weighted fill price
    pub price: Decimal,
    pub leverage: u32,
}

/// Result of an exit request.
#[derive(Debug, Clone, PartialEq)]
pub enum ExitFill {
    Filled {
        quantity: Decimal,
        price: Decimal,
        /// Requested but not executed; non-zero after a partial fill
        remaining: Decimal,
    },
    /// The venue holds nothing to close; flatten the record without an order.
    AlreadyFlat,
}

pub struct ExecutionAdapter {
    exchange: Arc<dyn Exchange>,
    allocation: AllocationPolicy,
    leverage: LeverageMap,
    margin_type: MarginType,
    quote_asset: String,
}

impl ExecutionAdapter {
    pub fn new(
        exchange: Arc<dyn Exchange>,
        allocation: AllocationPolicy,
        leverage: LeverageMap,
        margin_type: MarginType,
        quote_asset: impl Into<String>,
    ) -> Self {
        Self {
            exchange,
            allocation,
            leverage,
            margin_type,
            quote_asset: quote_asset.into(),
        }
    }

    pub fn venue(&self) -> Venue {
        self.exchange.venue()
    }

    /// Leverage used for `symbol`; 1 on spot.
    pub fn leverage_for(&self, symbol: &str) -> u32 {
        match self.venue() {
            Venue::Spot => 1,
            Venue::Futures => self.leverage.for_symbol(symbol),
        }
    }

    fn base_asset<'a>(&self, symbol: &'a str) -> &'a str {
        symbol
            .strip_suffix(self.quote_asset.as_str())
            .unwrap_or(symbol)
    }

    /// Open a position in `direction`.
    ///
    /// # Arguments
    /// * `last_price` - latest snapshot close, used for futures sizing and as
    ///   the fill price fallback
    pub async fn open(
        &self,
        symbol: &str,
        direction: Direction,
        last_price: Decimal,
    ) -> TradingResult<EntryFill> {
        self.sync_clock().await;
        match self.venue() {
            Venue::Spot => self.open_spot(symbol, direction, last_price).await,
            Venue::Futures => self.open_futures(symbol, direction, last_price).await,
        }
    }

    /// Refresh the venue clock offset before a signed order. A failed sync
    /// leaves the previous offset in place.
    async fn sync_clock(&self) {
        if let Err(e) = self.exchange.sync_time().await {
            warn!(exchange = self.exchange.name(), error = %e, "Clock sync failed, using previous offset");
        }
    }

    async fn open_spot(
        &self,
        symbol: &str,
        direction: Direction,
        last_price: Decimal,
    ) -> TradingResult<EntryFill> {
        if direction != Direction::Long {
            return Err(TradingError::VenueRejected(
                "spot venue cannot open short positions".into(),
            ));
        }

        let free = self.exchange.get_free_balance(&self.quote_asset).await?;
        let filters = self.exchange.get_symbol_filters(symbol).await?;
        let quote = self.allocation.size_spot(free, &filters)?;

        let order = MarketOrder::quote(symbol, Side::Buy, quote).with_client_order_id(client_id());
        info!(symbol, %quote, %free, "Submitting spot entry");
        let report = self.exchange.submit_market_order(order).await?;
        let (quantity, price) = reconcile(&report, last_price)?;

        Ok(EntryFill {
            direction,
            quantity,
            price,
            leverage: 1,
        })
    }

    async fn open_futures(
        &self,
        symbol: &str,
        direction: Direction,
        last_price: Decimal,
    ) -> TradingResult<EntryFill> {
        let leverage = self.leverage.for_symbol(symbol);

        // best effort: usually "no need to change"
        if let Err(e) = self
            .exchange
            .prepare_symbol(symbol, leverage, self.margin_type)
            .await
        {
            warn!(symbol, leverage, error = %e, "Could not apply leverage or margin type");
        }

        let free = self.exchange.get_free_balance(&self.quote_asset).await?;
        let filters = self.exchange.get_symbol_filters(symbol).await?;
        let sizing = self
            .allocation
            .size_futures(free, last_price, leverage, &filters)?;

        let order = MarketOrder::base(symbol, direction.entry_side(), sizing.quantity)
            .with_client_order_id(client_id());
        info!(
            symbol,
            %direction,
            quantity = %sizing.quantity,
            notional = %sizing.notional,
            leverage,
            "Submitting futures entry"
        );
        let report = self.exchange.submit_market_order(order).await?;
        let (quantity, price) = reconcile(&report, last_price)?;

        Ok(EntryFill {
            direction,
            quantity,
            price,
            leverage,
        })
    }

    /// Close `position` in full.
    pub async fn close(&self, position: &Position, last_price: Decimal) -> TradingResult<ExitFill> {
        self.sync_clock().await;
        match self.venue() {
            Venue::Spot => self.close_spot(position, last_price).await,
            Venue::Futures => self.close_futures(position, last_price).await,
        }
    }

    async fn close_spot(&self, position: &Position, last_price: Decimal) -> TradingResult<ExitFill> {
        let symbol = position.symbol.as_str();
        let filters = self.exchange.get_symbol_filters(symbol).await?;

        // commissions taken in the base asset can leave less than we bought
        let held = self
            .exchange
            .get_free_balance(self.base_asset(symbol))
            .await?;
        let quantity = filters.floor_qty(position.quantity.min(held));
        if quantity <= Decimal::ZERO {
            warn!(symbol, recorded = %position.quantity, %held, "Nothing left to sell");
            return Ok(ExitFill::AlreadyFlat);
        }

        let order = MarketOrder::base(symbol, Side::Sell, quantity).with_client_order_id(client_id());
        info!(symbol, %quantity, "Submitting spot exit");
        let report = self.exchange.submit_market_order(order).await?;
        let (filled, price) = reconcile(&report, last_price)?;
        Ok(exit_fill(symbol, quantity, filled, price))
    }

    async fn close_futures(
        &self,
        position: &Position,
        last_price: Decimal,
    ) -> TradingResult<ExitFill> {
        let symbol = position.symbol.as_str();
        let Some(open) = self.exchange.get_open_position(symbol).await? else {
            warn!(symbol, "Venue reports no open position");
            return Ok(ExitFill::AlreadyFlat);
        };
        if open.direction != position.direction {
            return Err(TradingError::VenueRejected(format!(
                "venue holds {} {} but the runner recorded {}",
                open.direction, symbol, position.direction
            )));
        }

        let order = MarketOrder::base(symbol, position.direction.exit_side(), open.quantity)
            .reduce_only()
            .with_client_order_id(client_id());
        info!(symbol, quantity = %open.quantity, "Submitting reduce-only exit");
        let report = self.exchange.submit_market_order(order).await?;
        let (filled, price) = reconcile(&report, last_price)?;
        Ok(exit_fill(symbol, open.quantity, filled, price))
    }
}

/// Executed quantity and VWAP price; zero execution is a rejection.
fn reconcile(report: &OrderReport, fallback: Decimal) -> TradingResult<(Decimal, Decimal)> {
    let quantity = report.filled_quantity();
    if quantity <= Decimal::ZERO {
        return Err(TradingError::VenueRejected(format!(
            "order {} executed zero quantity",
            report.order_id
        )));
    }
    let price = report.fill_price(fallback);
    debug!(order_id = %report.order_id, %quantity, %price, fills = report.fills.len(), "Reconciled fill");
    Ok((quantity, price))
}

fn exit_fill(symbol: &str, requested: Decimal, filled: Decimal, price: Decimal) -> ExitFill {
    let remaining = (requested - filled).max(Decimal::ZERO);
    if remaining > Decimal::ZERO {
        warn!(symbol, %requested, %filled, %remaining, "Exit only partially filled");
    }
    ExitFill::Filled {
        quantity: filled,
        price,
        remaining,
    }
}

fn client_id() -> String {
    Uuid::new_v4().simple().to_string()
}
