//! Binance wire types.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use runner_core::{Bar, Direction, ExchangeError, Fill, OrderReport, SymbolFilters, VenuePosition};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerTime {
    pub server_time: i64,
}

pub(crate) fn parse_decimal(value: &str, field: &str) -> Result<Decimal, ExchangeError> {
    value
        .trim()
        .parse()
        .map_err(|_| ExchangeError::Decode(format!("{}: not a decimal: {:?}", field, value)))
}

fn value_f64(value: &Value) -> Option<f64> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// One kline row: `[open_time, open, high, low, close, volume, close_time, ...]`.
pub(crate) fn parse_kline(row: &[Value]) -> Result<Bar, ExchangeError> {
    let field = |i: usize| {
        row.get(i)
            .and_then(value_f64)
            .ok_or_else(|| ExchangeError::Decode(format!("kline field {} missing", i)))
    };
    let open_time = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| ExchangeError::Decode("kline open time missing".into()))?;

    Ok(Bar::new(
        open_time,
        field(1)?,
        field(2)?,
        field(3)?,
        field(4)?,
        field(5)?,
    ))
}

pub(crate) fn parse_klines(rows: Vec<Vec<Value>>) -> Result<Vec<Bar>, ExchangeError> {
    rows.iter().map(|row| parse_kline(row)).collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub filters: Vec<RawFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawFilter {
    pub filter_type: String,
    pub min_notional: Option<String>,
    pub notional: Option<String>,
    pub min_qty: Option<String>,
    pub step_size: Option<String>,
    pub tick_size: Option<String>,
}

impl ExchangeInfo {
    pub(crate) fn filters_for(&self, symbol: &str) -> Result<SymbolFilters, ExchangeError> {
        self.symbols
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
            .map(|s| collect_filters(&s.filters))
            .ok_or_else(|| ExchangeError::SymbolNotFound(symbol.to_string()))
    }
}

/// Fold the venue's filter list into [`SymbolFilters`].
///
/// Both `MIN_NOTIONAL` and `NOTIONAL` may appear; the larger minimum wins.
/// When `LOT_SIZE` and `MARKET_LOT_SIZE` both appear the coarser step wins,
/// since market orders must satisfy both. Minimum notional defaults to 5.
pub(crate) fn collect_filters(raw: &[RawFilter]) -> SymbolFilters {
    let num = |v: &Option<String>| v.as_deref().and_then(|s| s.parse::<Decimal>().ok());

    let mut min_notional: Option<Decimal> = None;
    let mut filters = SymbolFilters {
        min_notional: Decimal::ZERO,
        ..SymbolFilters::default()
    };

    for f in raw {
        match f.filter_type.as_str() {
            "MIN_NOTIONAL" | "NOTIONAL" => {
                for value in [num(&f.min_notional), num(&f.notional)].into_iter().flatten() {
                    min_notional = Some(min_notional.map_or(value, |m| m.max(value)));
                }
            }
            "LOT_SIZE" | "MARKET_LOT_SIZE" => {
                if let Some(step) = num(&f.step_size) {
                    filters.step_size = filters.step_size.max(step);
                }
                if let Some(min_qty) = num(&f.min_qty) {
                    filters.min_qty = filters.min_qty.max(min_qty);
                }
            }
            "PRICE_FILTER" => {
                if let Some(tick) = num(&f.tick_size) {
                    filters.tick_size = tick;
                }
            }
            _ => {}
        }
    }

    filters.min_notional = min_notional.filter(|m| *m > Decimal::ZERO).unwrap_or(dec!(5));
    filters
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotAccount {
    pub balances: Vec<SpotBalance>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SpotBalance {
    pub asset: String,
    pub free: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpotFill {
    pub price: String,
    pub qty: String,
    #[serde(default)]
    pub commission: Option<String>,
    #[serde(default)]
    pub commission_asset: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SpotOrderResponse {
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub executed_qty: String,
    #[serde(default)]
    pub cummulative_quote_qty: Option<String>,
    #[serde(default)]
    pub fills: Vec<SpotFill>,
}

impl SpotOrderResponse {
    pub(crate) fn into_report(self) -> Result<OrderReport, ExchangeError> {
        let executed_qty = parse_decimal(&self.executed_qty, "executedQty")?;

        let mut fills = Vec::with_capacity(self.fills.len());
        for f in &self.fills {
            let mut fill = Fill::new(
                parse_decimal(&f.price, "fills.price")?,
                parse_decimal(&f.qty, "fills.qty")?,
            );
            if let Some(commission) = &f.commission {
                fill.commission = parse_decimal(commission, "fills.commission")?;
            }
            fill.commission_asset = f.commission_asset.clone();
            fills.push(fill);
        }

        // cumulative quote / executed is the average when fills are absent
        let avg_price = match &self.cummulative_quote_qty {
            Some(quote) if executed_qty > Decimal::ZERO => {
                Some(parse_decimal(quote, "cummulativeQuoteQty")? / executed_qty)
            }
            _ => None,
        };

        Ok(OrderReport {
            order_id: self.order_id.to_string(),
            client_order_id: self.client_order_id,
            executed_qty,
            avg_price,
            fills,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FuturesBalance {
    pub asset: String,
    pub available_balance: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FuturesOrderResponse {
    pub order_id: i64,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub executed_qty: String,
    #[serde(default)]
    pub avg_price: Option<String>,
}

impl FuturesOrderResponse {
    pub(crate) fn into_report(self) -> Result<OrderReport, ExchangeError> {
        let avg_price = match &self.avg_price {
            Some(p) => Some(parse_decimal(p, "avgPrice")?).filter(|p| *p > Decimal::ZERO),
            None => None,
        };
        Ok(OrderReport {
            order_id: self.order_id.to_string(),
            client_order_id: self.client_order_id,
            executed_qty: parse_decimal(&self.executed_qty, "executedQty")?,
            avg_price,
            fills: Vec::new(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PositionRisk {
    pub symbol: String,
    pub position_amt: String,
    pub entry_price: String,
}

impl PositionRisk {
    /// Signed amount to a venue position; zero means flat.
    pub(crate) fn into_position(self) -> Result<Option<VenuePosition>, ExchangeError> {
        let amount = parse_decimal(&self.position_amt, "positionAmt")?;
        if amount.is_zero() {
            return Ok(None);
        }
        let direction = if amount > Decimal::ZERO {
            Direction::Long
        } else {
            Direction::Short
        };
        Ok(Some(VenuePosition {
            symbol: self.symbol,
            direction,
            quantity: amount.abs(),
            entry_price: parse_decimal(&self.entry_price, "entryPrice")?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kline() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(
            r#"[[1714564800000,"100.5","101.0","99.5","100.8","12.3",1714564859999,"0",1,"0","0","0"]]"#,
        )
        .unwrap();
        let bars = parse_klines(rows).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].timestamp, 1_714_564_800_000);
        assert_eq!(bars[0].close, 100.8);
        assert_eq!(bars[0].volume, 12.3);
    }

    #[test]
    fn test_kline_missing_field() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(r#"[[1714564800000,"100.5"]]"#).unwrap();
        assert!(matches!(parse_klines(rows), Err(ExchangeError::Decode(_))));
    }

    #[test]
    fn test_spot_filters() {
        let info: ExchangeInfo = serde_json::from_str(
            r#"{"symbols":[{"symbol":"BTCUSDT","filters":[
                {"filterType":"PRICE_FILTER","minPrice":"0.01","maxPrice":"1000000.00","tickSize":"0.01"},
                {"filterType":"LOT_SIZE","minQty":"0.00001","maxQty":"9000","stepSize":"0.00001"},
                {"filterType":"NOTIONAL","minNotional":"5.00000000","applyMinToMarket":true}
            ]}]}"#,
        )
        .unwrap();
        let filters = info.filters_for("btcusdt").unwrap();
        assert_eq!(filters.min_notional, dec!(5));
        assert_eq!(filters.step_size, dec!(0.00001));
        assert_eq!(filters.tick_size, dec!(0.01));
        assert!(info.filters_for("ETHUSDT").is_err());
    }

    #[test]
    fn test_futures_filters_coarser_step() {
        let raw: Vec<RawFilter> = serde_json::from_str(
            r#"[
                {"filterType":"LOT_SIZE","minQty":"0.001","stepSize":"0.001"},
                {"filterType":"MARKET_LOT_SIZE","minQty":"0.001","stepSize":"0.01"},
                {"filterType":"MIN_NOTIONAL","notional":"100"}
            ]"#,
        )
        .unwrap();
        let filters = collect_filters(&raw);
        assert_eq!(filters.step_size, dec!(0.01));
        assert_eq!(filters.min_notional, dec!(100));
    }

    #[test]
    fn test_missing_notional_defaults() {
        assert_eq!(collect_filters(&[]).min_notional, dec!(5));
    }

    #[test]
    fn test_spot_order_report() {
        let resp: SpotOrderResponse = serde_json::from_str(
            r#"{"symbol":"BTCUSDT","orderId":28,"clientOrderId":"abc","executedQty":"0.003",
                "cummulativeQuoteQty":"0.3003","status":"FILLED",
                "fills":[{"price":"100","qty":"0.001","commission":"0","commissionAsset":"BNB"},
                         {"price":"100.15","qty":"0.002","commission":"0","commissionAsset":"BNB"}]}"#,
        )
        .unwrap();
        let report = resp.into_report().unwrap();
        assert_eq!(report.filled_quantity(), dec!(0.003));
        assert_eq!(report.vwap(), Some(dec!(100.1)));
        assert_eq!(report.avg_price, Some(dec!(100.1)));
    }

    #[test]
    fn test_position_risk() {
        let short: PositionRisk = serde_json::from_str(
            r#"{"symbol":"ETHUSDT","positionAmt":"-0.250","entryPrice":"3000.0","leverage":"10"}"#,
        )
        .unwrap();
        let pos = short.into_position().unwrap().unwrap();
        assert_eq!(pos.direction, Direction::Short);
        assert_eq!(pos.quantity, dec!(0.250));

        let flat: PositionRisk = serde_json::from_str(
            r#"{"symbol":"ETHUSDT","positionAmt":"0.000","entryPrice":"0.0"}"#,
        )
        .unwrap();
        assert!(flat.into_position().unwrap().is_none());
    }
}
