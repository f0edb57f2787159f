//! Exchange trait definition.

use crate::error::ExchangeError;
use crate::types::{
    Bar, MarginType, MarketOrder, OrderReport, SymbolFilters, Timeframe, Venue, VenuePosition,
};
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Trait for exchange integrations.
///
/// Every call is delivered at most once with a fixed timeout; adapters never
/// retry on their own. The engine decides what a failure means.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Market this adapter trades.
    fn venue(&self) -> Venue;

    /// Get the exchange name.
    fn name(&self) -> &str;

    /// Fetch the most recent closed and in-progress candles.
    ///
    /// # Arguments
    /// * `symbol` - The symbol to fetch
    /// * `timeframe` - Candle interval
    /// * `limit` - Maximum number of candles
    ///
    /// # Returns
    /// Candles ordered from oldest to newest
    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError>;

    /// Get the free (unlocked) balance of an asset.
    ///
    /// # Arguments
    /// * `asset` - Asset code, e.g. `USDT`
    async fn get_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError>;

    /// Get trading filters for a symbol.
    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, ExchangeError>;

    /// Submit an immediate market order.
    ///
    /// # Arguments
    /// * `order` - The order to submit
    ///
    /// # Returns
    /// The execution report with fills or an aggregate average price
    async fn submit_market_order(&self, order: MarketOrder) -> Result<OrderReport, ExchangeError>;

    /// Get open exposure for a symbol. Spot venues have none to report.
    async fn get_open_position(
        &self,
        _symbol: &str,
    ) -> Result<Option<VenuePosition>, ExchangeError> {
        Ok(None)
    }

    /// Apply leverage and margin type before sizing. No-op on spot.
    ///
    /// # Arguments
    /// * `symbol` - The symbol about to be traded
    /// * `leverage` - Leverage multiplier
    /// * `margin` - Margin mode
    async fn prepare_symbol(
        &self,
        _symbol: &str,
        _leverage: u32,
        _margin: MarginType,
    ) -> Result<(), ExchangeError> {
        Ok(())
    }

    /// Re-measure the offset between the local and the venue clock.
    async fn sync_time(&self) -> Result<(), ExchangeError> {
        Ok(())
    }
}
