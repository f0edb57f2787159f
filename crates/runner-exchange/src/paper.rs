//! Paper exchange for offline runs and tests.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};
use uuid::Uuid;
use runner_core::error::DataError;
use runner_core::{
    decimal_price, Bar, Direction, Exchange, ExchangeError, Fill, MarginType, MarketOrder,
    OrderReport, OrderSizing, Side, SymbolFilters, Timeframe, Venue, VenuePosition,
};

#[derive(Debug)]
struct PaperPosition {
    position: VenuePosition,
    margin: Decimal,
}

#[derive(Debug, Default)]
struct PaperState {
    balances: HashMap<String, Decimal>,
    /// Bars visible to `fetch_recent_candles`
    history: HashMap<String, Vec<Bar>>,
    /// Replay bars not yet revealed
    pending: HashMap<String, VecDeque<Bar>>,
    positions: HashMap<String, PaperPosition>,
    leverage: HashMap<String, u32>,
    orders: Vec<MarketOrder>,
    fail_next_order: Option<ExchangeError>,
    fail_candles: Option<ExchangeError>,
    /// Fraction of the next order that executes
    partial_next: Option<Decimal>,
    clock_syncs: usize,
}

/// In-memory exchange that fills market orders at the last visible close.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the engine owns another.
#[derive(Debug, Clone)]
pub struct PaperExchange {
    venue: Venue,
    quote_asset: String,
    state: Arc<Mutex<PaperState>>,
    filters: SymbolFilters,
    /// Slippage in percent, applied against the taker
    slippage_pct: Decimal,
    /// Commission as a fraction of notional, charged in the quote asset
    commission_rate: Decimal,
    default_leverage: u32,
}

impl PaperExchange {
    /// Create a paper exchange holding `initial_quote` of `quote_asset`.
    pub fn new(venue: Venue, quote_asset: impl Into<String>, initial_quote: Decimal) -> Self {
        let quote_asset = quote_asset.into().to_uppercase();
        let mut state = PaperState::default();
        state.balances.insert(quote_asset.clone(), initial_quote);
        Self {
            venue,
            quote_asset,
            state: Arc::new(Mutex::new(state)),
            filters: SymbolFilters::default(),
            slippage_pct: Decimal::ZERO,
            commission_rate: Decimal::ZERO,
            default_leverage: 1,
        }
    }

    pub fn spot(initial_usdt: Decimal) -> Self {
        Self::new(Venue::Spot, "USDT", initial_usdt)
    }

    pub fn futures(initial_usdt: Decimal) -> Self {
        Self::new(Venue::Futures, "USDT", initial_usdt)
    }

    /// Set the filters reported for every symbol.
    pub fn with_filters(mut self, filters: SymbolFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set slippage percentage.
    pub fn with_slippage(mut self, slippage_pct: Decimal) -> Self {
        self.slippage_pct = slippage_pct;
        self
    }

    /// Set commission as a fraction of notional.
    pub fn with_commission(mut self, rate: Decimal) -> Self {
        self.commission_rate = rate;
        self
    }

    fn state(&self) -> MutexGuard<'_, PaperState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn base_asset<'a>(&self, symbol: &'a str) -> &'a str {
        symbol.strip_suffix(self.quote_asset.as_str()).unwrap_or(symbol)
    }

    /// Append a bar to the visible history.
    pub fn push_bar(&self, symbol: &str, bar: Bar) {
        self.state()
            .history
            .entry(symbol.to_uppercase())
            .or_default()
            .push(bar);
    }

    /// Append a flat one-minute bar at `price`.
    pub fn set_price(&self, symbol: &str, price: f64) {
        let mut state = self.state();
        let bars = state.history.entry(symbol.to_uppercase()).or_default();
        let ts = bars.last().map_or(0, |b| b.timestamp + 60_000);
        bars.push(Bar::flat(ts, price));
    }

    /// Queue bars for replay; [`advance`](Self::advance) reveals them one at a time.
    pub fn load_replay(&self, symbol: &str, bars: Vec<Bar>) {
        self.state()
            .pending
            .entry(symbol.to_uppercase())
            .or_default()
            .extend(bars);
    }

    /// Queue replay bars from a CSV file.
    pub fn load_replay_csv(&self, symbol: &str, path: impl AsRef<Path>) -> Result<usize, DataError> {
        let bars = runner_data::load_csv(path)?;
        let count = bars.len();
        self.load_replay(symbol, bars);
        info!(symbol, bars = count, "Replay candles loaded");
        Ok(count)
    }

    /// Reveal the next replay bar. Returns it, or `None` when exhausted.
    pub fn advance(&self, symbol: &str) -> Option<Bar> {
        let symbol = symbol.to_uppercase();
        let mut state = self.state();
        let bar = state.pending.get_mut(&symbol)?.pop_front()?;
        state.history.entry(symbol).or_default().push(bar);
        Some(bar)
    }

    /// Replay bars still queued for `symbol`.
    pub fn remaining(&self, symbol: &str) -> usize {
        self.state()
            .pending
            .get(&symbol.to_uppercase())
            .map_or(0, VecDeque::len)
    }

    pub fn last_price(&self, symbol: &str) -> Option<Decimal> {
        self.state()
            .history
            .get(&symbol.to_uppercase())
            .and_then(|bars| bars.last())
            .and_then(|bar| decimal_price(bar.close))
    }

    pub fn set_balance(&self, asset: &str, amount: Decimal) {
        self.state().balances.insert(asset.to_uppercase(), amount);
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.state()
            .balances
            .get(&asset.to_uppercase())
            .copied()
            .unwrap_or_default()
    }

    /// Fail the next submitted order with `err`. The order is still recorded.
    pub fn fail_next_order(&self, err: ExchangeError) {
        self.state().fail_next_order = Some(err);
    }

    /// Execute only `fraction` of the next order, like a thin book would.
    pub fn fill_next_partially(&self, fraction: Decimal) {
        self.state().partial_next = Some(fraction);
    }

    /// How often the engine asked for a clock sync.
    pub fn clock_syncs(&self) -> usize {
        self.state().clock_syncs
    }

    /// Fail candle fetches with `err` until cleared with `None`.
    pub fn fail_candles(&self, err: Option<ExchangeError>) {
        self.state().fail_candles = err;
    }

    /// Drop the futures position for `symbol`, as if closed outside the runner.
    pub fn clear_position(&self, symbol: &str) {
        let mut state = self.state();
        if let Some(closed) = state.positions.remove(&symbol.to_uppercase()) {
            let quote = self.quote_asset.clone();
            *state.balances.entry(quote).or_default() += closed.margin;
        }
    }

    pub fn venue_position(&self, symbol: &str) -> Option<VenuePosition> {
        self.state()
            .positions
            .get(&symbol.to_uppercase())
            .map(|p| p.position.clone())
    }

    /// Every order submitted so far, including failed ones.
    pub fn submitted_orders(&self) -> Vec<MarketOrder> {
        self.state().orders.clone()
    }

    fn fill_price(&self, side: Side, market: Decimal) -> Decimal {
        let slip = self.slippage_pct / dec!(100);
        match side {
            Side::Buy => market * (Decimal::ONE + slip),
            Side::Sell => market * (Decimal::ONE - slip),
        }
    }

    fn fill_spot(
        &self,
        state: &mut PaperState,
        order: &MarketOrder,
        symbol: &str,
        price: Decimal,
    ) -> Result<OrderReport, ExchangeError> {
        let quantity = match order.sizing {
            OrderSizing::Quote(quote) => self.filters.floor_qty(quote / price),
            OrderSizing::Base(qty) => self.filters.floor_qty(qty),
        };
        if quantity <= Decimal::ZERO || quantity < self.filters.min_qty {
            return Err(filter_failure("LOT_SIZE"));
        }
        let notional = quantity * price;
        if notional < self.filters.min_notional {
            return Err(filter_failure("NOTIONAL"));
        }
        let commission = notional * self.commission_rate;

        let base = self.base_asset(symbol).to_string();
        let quote_bal = state.balances.get(&self.quote_asset).copied().unwrap_or_default();
        let base_bal = state.balances.get(&base).copied().unwrap_or_default();

        match order.side {
            Side::Buy => {
                if quote_bal < notional + commission {
                    return Err(insufficient_balance());
                }
                state.balances.insert(self.quote_asset.clone(), quote_bal - notional - commission);
                state.balances.insert(base, base_bal + quantity);
            }
            Side::Sell => {
                if base_bal < quantity {
                    return Err(insufficient_balance());
                }
                state.balances.insert(base, base_bal - quantity);
                state.balances.insert(self.quote_asset.clone(), quote_bal + notional - commission);
            }
        }

        let mut fill = Fill::new(price, quantity);
        fill.commission = commission;
        fill.commission_asset = Some(self.quote_asset.clone());
        Ok(OrderReport {
            order_id: Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            executed_qty: quantity,
            avg_price: Some(price),
            fills: vec![fill],
        })
    }

    fn fill_futures(
        &self,
        state: &mut PaperState,
        order: &MarketOrder,
        symbol: &str,
        price: Decimal,
    ) -> Result<OrderReport, ExchangeError> {
        let requested = match order.sizing {
            OrderSizing::Base(qty) => self.filters.floor_qty(qty),
            OrderSizing::Quote(_) => {
                return Err(ExchangeError::OrderRejected(
                    "futures orders must be sized in base quantity".into(),
                ))
            }
        };
        if requested <= Decimal::ZERO {
            return Err(filter_failure("LOT_SIZE"));
        }

        let quote_bal = state.balances.get(&self.quote_asset).copied().unwrap_or_default();
        let executed = if order.reduce_only {
            let Some(held) = state.positions.get_mut(symbol) else {
                return Err(reduce_only_rejected());
            };
            if held.position.direction.exit_side() != order.side {
                return Err(reduce_only_rejected());
            }

            let qty = requested.min(held.position.quantity);
            let pnl = (price - held.position.entry_price) * qty * held.position.direction.sign();
            let released = held.margin * qty / held.position.quantity;
            let commission = qty * price * self.commission_rate;

            held.position.quantity -= qty;
            held.margin -= released;
            if held.position.quantity.is_zero() {
                state.positions.remove(symbol);
            }
            state
                .balances
                .insert(self.quote_asset.clone(), quote_bal + released + pnl - commission);
            qty
        } else {
            let direction = match order.side {
                Side::Buy => Direction::Long,
                Side::Sell => Direction::Short,
            };
            if state
                .positions
                .get(symbol)
                .is_some_and(|p| p.position.direction != direction)
            {
                return Err(ExchangeError::OrderRejected(
                    "opposite position open; close it first".into(),
                ));
            }

            let notional = requested * price;
            if notional < self.filters.min_notional {
                return Err(filter_failure("NOTIONAL"));
            }
            let leverage = state
                .leverage
                .get(symbol)
                .copied()
                .unwrap_or(self.default_leverage)
                .max(1);
            let margin = notional / Decimal::from(leverage);
            let commission = notional * self.commission_rate;
            if quote_bal < margin + commission {
                return Err(ExchangeError::Api {
                    code: -2019,
                    message: "Margin is insufficient.".into(),
                });
            }
            state
                .balances
                .insert(self.quote_asset.clone(), quote_bal - margin - commission);

            let held = state.positions.entry(symbol.to_string()).or_insert(PaperPosition {
                position: VenuePosition {
                    symbol: symbol.to_string(),
                    direction,
                    quantity: Decimal::ZERO,
                    entry_price: price,
                },
                margin: Decimal::ZERO,
            });
            let total = held.position.quantity + requested;
            held.position.entry_price =
                (held.position.entry_price * held.position.quantity + price * requested) / total;
            held.position.quantity = total;
            held.margin += margin;
            requested
        };

        Ok(OrderReport {
            order_id: Uuid::new_v4().to_string(),
            client_order_id: order.client_order_id.clone(),
            executed_qty: executed,
            avg_price: Some(price),
            fills: Vec::new(),
        })
    }
}

fn filter_failure(filter: &str) -> ExchangeError {
    ExchangeError::Api {
        code: -1013,
        message: format!("Filter failure: {}", filter),
    }
}

fn insufficient_balance() -> ExchangeError {
    ExchangeError::Api {
        code: -2010,
        message: "Account has insufficient balance for requested action.".into(),
    }
}

fn reduce_only_rejected() -> ExchangeError {
    ExchangeError::Api {
        code: -2022,
        message: "ReduceOnly Order is rejected.".into(),
    }
}

#[async_trait]
impl Exchange for PaperExchange {
    fn venue(&self) -> Venue {
        self.venue
    }

    fn name(&self) -> &str {
        "paper"
    }

    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        _timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let state = self.state();
        if let Some(err) = &state.fail_candles {
            return Err(err.clone());
        }
        let bars = state
            .history
            .get(&symbol.to_uppercase())
            .filter(|bars| !bars.is_empty())
            .ok_or_else(|| ExchangeError::NoData(symbol.to_string()))?;
        let start = bars.len().saturating_sub(limit);
        Ok(bars[start..].to_vec())
    }

    async fn get_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        Ok(self.balance(asset))
    }

    async fn get_symbol_filters(&self, _symbol: &str) -> Result<SymbolFilters, ExchangeError> {
        Ok(self.filters)
    }

    async fn submit_market_order(&self, order: MarketOrder) -> Result<OrderReport, ExchangeError> {
        let symbol = order.symbol.to_uppercase();
        let mut state = self.state();
        state.orders.push(order.clone());

        if let Some(err) = state.fail_next_order.take() {
            debug!(symbol = %symbol, error = %err, "Injected order failure");
            return Err(err);
        }

        let mut order = order;
        if let Some(fraction) = state.partial_next.take() {
            order.sizing = match order.sizing {
                OrderSizing::Quote(quote) => OrderSizing::Quote(quote * fraction),
                OrderSizing::Base(qty) => OrderSizing::Base(qty * fraction),
            };
            debug!(symbol = %symbol, %fraction, "Injected partial fill");
        }

        let market = state
            .history
            .get(&symbol)
            .and_then(|bars| bars.last())
            .and_then(|bar| decimal_price(bar.close))
            .ok_or_else(|| ExchangeError::NoData(format!("no price for {}", symbol)))?;
        let price = self.fill_price(order.side, market);

        let report = match self.venue {
            Venue::Spot => self.fill_spot(&mut state, &order, &symbol, price)?,
            Venue::Futures => self.fill_futures(&mut state, &order, &symbol, price)?,
        };
        debug!(
            symbol = %symbol,
            side = order.side.as_str(),
            qty = %report.executed_qty,
            price = %price,
            "Paper fill"
        );
        Ok(report)
    }

    async fn get_open_position(&self, symbol: &str) -> Result<Option<VenuePosition>, ExchangeError> {
        if !self.venue.is_futures() {
            return Ok(None);
        }
        Ok(self.venue_position(symbol))
    }

    async fn sync_time(&self) -> Result<(), ExchangeError> {
        self.state().clock_syncs += 1;
        Ok(())
    }

    async fn prepare_symbol(
        &self,
        symbol: &str,
        leverage: u32,
        _margin: MarginType,
    ) -> Result<(), ExchangeError> {
        if self.venue.is_futures() {
            self.state().leverage.insert(symbol.to_uppercase(), leverage);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spot_buy_and_sell() {
        let paper = PaperExchange::spot(dec!(100)).with_filters(SymbolFilters {
            step_size: dec!(0.001),
            ..SymbolFilters::default()
        });
        paper.set_price("BTCUSDT", 10.0);

        let buy = paper
            .submit_market_order(MarketOrder::quote("BTCUSDT", Side::Buy, dec!(50)))
            .await
            .unwrap();
        assert_eq!(buy.filled_quantity(), dec!(5));
        assert_eq!(paper.balance("USDT"), dec!(50));
        assert_eq!(paper.balance("BTC"), dec!(5));

        paper.set_price("BTCUSDT", 12.0);
        let sell = paper
            .submit_market_order(MarketOrder::base("BTCUSDT", Side::Sell, dec!(5)))
            .await
            .unwrap();
        assert_eq!(sell.fill_price(Decimal::ZERO), dec!(12));
        assert_eq!(paper.balance("USDT"), dec!(110));
        assert_eq!(paper.balance("BTC"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_spot_insufficient_balance() {
        let paper = PaperExchange::spot(dec!(10));
        paper.set_price("BTCUSDT", 100.0);
        let err = paper
            .submit_market_order(MarketOrder::quote("BTCUSDT", Side::Buy, dec!(20)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Api { code: -2010, .. }));
        assert_eq!(paper.balance("USDT"), dec!(10));
    }

    #[tokio::test]
    async fn test_futures_short_round_trip() {
        let paper = PaperExchange::futures(dec!(100));
        paper.prepare_symbol("ETHUSDT", 10, MarginType::Isolated).await.unwrap();
        paper.set_price("ETHUSDT", 100.0);

        paper
            .submit_market_order(MarketOrder::base("ETHUSDT", Side::Sell, dec!(5)))
            .await
            .unwrap();
        // 500 notional at 10x locks 50
        assert_eq!(paper.balance("USDT"), dec!(50));
        let held = paper.get_open_position("ETHUSDT").await.unwrap().unwrap();
        assert_eq!(held.direction, Direction::Short);
        assert_eq!(held.quantity, dec!(5));

        paper.set_price("ETHUSDT", 90.0);
        let close = paper
            .submit_market_order(MarketOrder::base("ETHUSDT", Side::Buy, dec!(5)).reduce_only())
            .await
            .unwrap();
        assert_eq!(close.executed_qty, dec!(5));
        assert_eq!(close.avg_price, Some(dec!(90)));
        assert_eq!(paper.balance("USDT"), dec!(150));
        assert!(paper.get_open_position("ETHUSDT").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reduce_only_without_position() {
        let paper = PaperExchange::futures(dec!(100));
        paper.set_price("ETHUSDT", 100.0);
        let err = paper
            .submit_market_order(MarketOrder::base("ETHUSDT", Side::Sell, dec!(1)).reduce_only())
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Api { code: -2022, .. }));
    }

    #[tokio::test]
    async fn test_injected_failures() {
        let paper = PaperExchange::spot(dec!(100));
        paper.set_price("BTCUSDT", 10.0);

        paper.fail_next_order(ExchangeError::Timeout("order".into()));
        let err = paper
            .submit_market_order(MarketOrder::quote("BTCUSDT", Side::Buy, dec!(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Timeout(_)));
        assert_eq!(paper.submitted_orders().len(), 1);
        assert_eq!(paper.balance("USDT"), dec!(100));

        paper.fail_candles(Some(ExchangeError::Connection("down".into())));
        assert!(paper
            .fetch_recent_candles("BTCUSDT", Timeframe::Minute1, 10)
            .await
            .is_err());
        paper.fail_candles(None);
        assert_eq!(
            paper
                .fetch_recent_candles("BTCUSDT", Timeframe::Minute1, 10)
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_replay_reveals_bars() {
        let paper = PaperExchange::spot(dec!(100));
        paper.load_replay("BTCUSDT", (0..3).map(|i| Bar::flat(i * 60_000, 100.0 + i as f64)).collect());

        assert!(paper
            .fetch_recent_candles("BTCUSDT", Timeframe::Minute1, 10)
            .await
            .is_err());
        paper.advance("BTCUSDT");
        paper.advance("BTCUSDT");
        assert_eq!(paper.remaining("BTCUSDT"), 1);
        assert_eq!(paper.last_price("BTCUSDT"), Some(dec!(101)));

        let bars = paper
            .fetch_recent_candles("BTCUSDT", Timeframe::Minute1, 1)
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 101.0);
    }
}
