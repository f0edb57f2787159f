//! Binance USDT-M Futures adapter.

use async_trait::async_trait;
use reqwest::Method;
use rust_decimal::Decimal;
use runner_core::{
    Bar, Exchange, ExchangeError, MarginType, MarketOrder, OrderReport, OrderSizing,
    SymbolFilters, Timeframe, Venue, VenuePosition,
};
use serde_json::Value;
use tracing::{debug, info};

use super::client::{BinanceClient, BinanceCredentials, BinanceSettings};
use super::wire::{
    parse_decimal, parse_klines, ExchangeInfo, FuturesBalance, FuturesOrderResponse,
    PositionRisk,
};

const PROD_URL: &str = "https://fapi.binance.com";
const TESTNET_URL: &str = "https://testnet.binancefuture.com";
const MAX_KLINES: usize = 1500;

/// "No need to change margin type."
const MARGIN_UNCHANGED: i64 = -4046;

/// Binance USDT-M Futures exchange, one-way position mode.
pub struct BinanceFutures {
    client: BinanceClient,
}

impl BinanceFutures {
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

/// Order parameters for `POST /fapi/v1/order`. Futures orders are base-sized.
pub(crate) fn order_params(order: &MarketOrder) -> Result<Vec<(&'static str, String)>, ExchangeError> {
    let quantity = match order.sizing {
        OrderSizing::Base(qty) => qty,
        OrderSizing::Quote(_) => {
            return Err(ExchangeError::OrderRejected(
                "futures orders must be sized in base quantity".into(),
            ))
        }
    };

    let mut params = vec![
        ("symbol", order.symbol.to_uppercase()),
        ("side", order.side.as_str().to_string()),
        ("type", "MARKET".to_string()),
        ("quantity", quantity.normalize().to_string()),
    ];
    if order.reduce_only {
        params.push(("reduceOnly", "true".to_string()));
    }
    if let Some(id) = &order.client_order_id {
        params.push(("newClientOrderId", id.clone()));
    }
    params.push(("newOrderRespType", "RESULT".to_string()));
    Ok(params)
}

#[async_trait]
impl Exchange for BinanceFutures {
    fn venue(&self) -> Venue {
        Venue::Futures
    }

    fn name(&self) -> &str {
        "binance-futures"
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
        let rows: Vec<Vec<Value>> = self.client.public_get("/fapi/v1/klines", &params).await?;
        parse_klines(rows)
    }

    async fn get_free_balance(&self, asset: &str) -> Result<Decimal, ExchangeError> {
        let balances: Vec<FuturesBalance> = self
            .client
            .signed(Method::GET, "/fapi/v2/balance", Vec::new())
            .await?;
        match balances.iter().find(|b| b.asset.eq_ignore_ascii_case(asset)) {
            Some(balance) => parse_decimal(&balance.available_balance, "availableBalance"),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn get_symbol_filters(&self, symbol: &str) -> Result<SymbolFilters, ExchangeError> {
        let info: ExchangeInfo = self.client.public_get("/fapi/v1/exchangeInfo", &[]).await?;
        info.filters_for(symbol)
    }

    async fn submit_market_order(&self, order: MarketOrder) -> Result<OrderReport, ExchangeError> {
        let params = order_params(&order)?;
        debug!(venue = self.name(), base = self.client.base_url(), ?params, "Submitting order");

        let response: FuturesOrderResponse = self
            .client
            .signed(Method::POST, "/fapi/v1/order", params)
            .await?;
        let report = response.into_report()?;
        info!(
            symbol = %order.symbol,
            side = %order.side.as_str(),
            reduce_only = order.reduce_only,
            order_id = %report.order_id,
            executed = %report.executed_qty,
            avg_price = ?report.avg_price,
            "Futures order filled"
        );
        Ok(report)
    }

    async fn get_open_position(&self, symbol: &str) -> Result<Option<VenuePosition>, ExchangeError> {
        let risks: Vec<PositionRisk> = self
            .client
            .signed(
                Method::GET,
                "/fapi/v2/positionRisk",
                vec![("symbol", symbol.to_uppercase())],
            )
            .await?;

        // one-way mode reports a single row per symbol
        for risk in risks {
            if risk.symbol.eq_ignore_ascii_case(symbol) {
                if let Some(position) = risk.into_position()? {
                    return Ok(Some(position));
                }
            }
        }
        Ok(None)
    }

    async fn prepare_symbol(
        &self,
        symbol: &str,
        leverage: u32,
        margin: MarginType,
    ) -> Result<(), ExchangeError> {
        let margin_result: Result<Value, ExchangeError> = self
            .client
            .signed(
                Method::POST,
                "/fapi/v1/marginType",
                vec![
                    ("symbol", symbol.to_uppercase()),
                    ("marginType", margin.as_str().to_string()),
                ],
            )
            .await;
        match margin_result {
            Ok(_) => {}
            Err(ExchangeError::Api { code: MARGIN_UNCHANGED, .. }) => {
                debug!(symbol, margin = margin.as_str(), "Margin type already set");
            }
            Err(e) => return Err(e),
        }

        let _: Value = self
            .client
            .signed(
                Method::POST,
                "/fapi/v1/leverage",
                vec![
                    ("symbol", symbol.to_uppercase()),
                    ("leverage", leverage.to_string()),
                ],
            )
            .await?;
        info!(symbol, leverage, margin = margin.as_str(), "Futures symbol prepared");
        Ok(())
    }

    async fn sync_time(&self) -> Result<(), ExchangeError> {
        self.client.sync_time("/fapi/v1/time").await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_core::Side;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reduce_only_params() {
        let order = MarketOrder::base("ETHUSDT", Side::Buy, dec!(0.250)).reduce_only();
        let params = order_params(&order).unwrap();
        assert!(params.contains(&("quantity", "0.25".to_string())));
        assert!(params.contains(&("reduceOnly", "true".to_string())));
        assert!(params.contains(&("newOrderRespType", "RESULT".to_string())));
    }

    #[test]
    fn test_quote_sizing_rejected() {
        let order = MarketOrder::quote("ETHUSDT", Side::Buy, dec!(50));
        assert!(matches!(
            order_params(&order),
            Err(ExchangeError::OrderRejected(_))
        ));
    }
}
