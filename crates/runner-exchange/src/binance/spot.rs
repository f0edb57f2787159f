//! Binance Spot adapter.

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::{Decimal, RoundingStrategy};
use runner_core::{
    Bar, Exchange, ExchangeError, MarketOrder, OrderReport, OrderSizing, SymbolFilters,
    Timeframe, Venue,
};
use serde_json::Value;
use tracing::{debug, info};

use super::client::{BinanceClient, BinanceCredentials, BinanceSettings};
use super::wire::{parse_decimal, parse_klines, ExchangeInfo, SpotAccount, SpotOrderResponse};

const PROD_URL: &str = "https://api.binance.com";
const TESTNET_URL: &str = "https://testnet.binance.vision";
const MAX_KLINES: usize = 1000;

/// Binance Spot exchange.
pub struct BinanceSpot {
    client: BinanceClient,
}

impl BinanceSpot {
    /// Create a spot adapter. Without credentials only market data works.
    pub fn new(
        credentials: Option<BinanceCredentials>,
        settings: &BinanceSettings,
    ) -> Result<Self, ExchangeError> {
        let base = if settings.testnet { TESTNET_URL } else { PROD_URL };
        Ok(Self {
            client: BinanceClient::new(base, credentials, settings)?,
        })
    }
}

/// Order parameters for `POST /api/v3/order`.
pub(crate) fn order_params(order: &MarketOrder) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("symbol", order.symbol.to_uppercase()),
        ("side", order.side.as_str().to_string()),
        ("type", "MARKET".to_string()),
    ];
    match order.sizing {
        OrderSizing::Quote(amount) => params.push((
            "quoteOrderQty",
            amount
                .round_dp_with_strategy(2, RoundingStrategy::ToZero)
                .normalize()
                .to_string(),
        )),
        OrderSizing::Base(qty) => params.push(("quantity", qty.normalize().to_string())),
    }
    if let Some(id) = &order.client_order_id {
        params.push(("newClientOrderId", id.clone()));
    }
    params.push(("newOrderRespType", "FULL".to_string()));
    params
}

#[async_trait]
impl Exchange for BinanceSpot {
    fn venue(&self) -> Venue {
        Venue::Spot
    }

    fn name(&self) -> &str {
        "binance-spot"
    }

    async fn fetch_recent_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Bar>, ExchangeError> {
        let params = [
            ("symbol", symbol.to_uppercase()),
            ("interval", timeframe.as_interval().to_string()),
            ("limit", limit.clamp(1, MAX_KLINES).to_string()),
        ];
        let rows: Vec<Vec<Value>> = self.client.public_get("/api/v3/klines", &params).await?;
        parse_klines(rows)
    }

    async fn get_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        let account: SpotAccount = self
            .client
            .signed(Method::GET, "/api/v3/account", Vec::new())
            .await?;
        match account.balances.iter().find(|b| b.asset.eq_ignore_ascii_case(asset)) {
            Some(balance) => parse_decimal(&balance.free, "free"),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, ExchangeError> {
        let info: ExchangeInfo = self
            .client
            .public_get("/api/v3/exchangeInfo", &[("symbol", symbol.to_uppercase())])
            .await?;
        info.filters_for(symbol)
    }

    async fn submit_market_order(&self, order: MarketOrder) -> Result<OrderReport, ExchangeError> {
        let params = order_params(&order);
        debug!(venue = self.name(), base = self.client.base_url(), ?params, "Submitting order");

        let response: SpotOrderResponse = self
            .client
            .signed(Method::POST, "/api/v3/order", params)
            .await?;
        let report = response.into_report()?;
        info!(
            symbol = %order.symbol,
            side = %order.side.as_str(),
            order_id = %report.order_id,
            executed = %report.filled_quantity(),
            "Spot order filled"
        );
        Ok(report)
    }

    async fn sync_time(&self) -> Result<(), ExchangeError> {
        self.client.sync_time("/api/v3/time").await.map(|_| ())
    }
}
