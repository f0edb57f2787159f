//! The market snapshot cache.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use runner_core::{
    decimal_price, BarSeries, Exchange, Timeframe, TradingError, TradingResult,
};

/// Snapshot cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotSettings {
    /// Candles fetched per refresh
    pub candle_limit: usize,
    /// Older snapshots count as unavailable
    pub max_snapshot_age_secs: i64,
    pub timeframe: Timeframe,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            candle_limit: 900,
            max_snapshot_age_secs: 300,
            timeframe: Timeframe::Minute1,
        }
    }
}

/// One fetched series and when it was fetched.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    pub series: BarSeries,
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    pub fn symbol(&self) -> &str {
        &self.series.symbol
    }

    /// Last close as an exact decimal.
    pub fn last_price(&self) -> Option<Decimal> {
        self.series.last_close().and_then(decimal_price)
    }

    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        (now - self.fetched_at).num_seconds()
    }
}

/// Latest candles for the active symbol.
///
/// A failed refresh keeps the previous snapshot and leaves the minute
/// unmarked, so the next tick retries. Switching symbol discards the old
/// snapshot before fetching.
#[derive(Debug, Default)]
pub struct MarketSnapshotCache {
    settings: SnapshotSettings,
    snapshot: Option<MarketSnapshot>,
    /// Epoch minute of the last successful refresh
    refreshed_minute: Option<i64>,
}

fn epoch_minute(now: DateTime<Utc>) -> i64 {
    now.timestamp().div_euclid(60)
}

impl MarketSnapshotCache {
    pub fn new(settings: SnapshotSettings) -> Self {
        Self {
            settings,
            snapshot: None,
            refreshed_minute: None,
        }
    }

    pub fn settings(&self) -> &SnapshotSettings {
        &self.settings
    }

    /// Whether a fetch is due for `symbol` at `now`.
    pub fn needs_refresh(&self, symbol: &str, now: DateTime<Utc>) -> bool {
        match &self.snapshot {
            Some(snap) if snap.symbol() == symbol => {
                self.refreshed_minute != Some(epoch_minute(now))
            }
            _ => true,
        }
    }

    /// Refresh from the exchange if due.
    ///
    /// Returns `Ok(true)` when a new snapshot was stored, `Ok(false)` when
    /// the current one is still this minute's.
    pub async fn refresh(
        &mut self,
        exchange: &dyn Exchange,
        symbol: &str,
        now: DateTime<Utc>,
    ) -> TradingResult<bool> {
        if !self.needs_refresh(symbol, now) {
            return Ok(false);
        }

        if self
            .snapshot
            .as_ref()
            .is_some_and(|snap| snap.symbol() != symbol)
        {
            debug!(symbol, "Discarding snapshot for previous symbol");
            self.invalidate();
        }

        let bars = exchange
            .fetch_recent_candles(symbol, self.settings.timeframe, self.settings.candle_limit)
            .await
            .map_err(|e| {
                warn!(symbol, error = %e, "Candle refresh failed, keeping previous snapshot");
                TradingError::from(e)
            })?;

        if bars.is_empty() {
            return Err(TradingError::DataUnavailable(format!(
                "no candles returned for {}",
                symbol
            )));
        }

        let mut series = BarSeries::with_capacity(
            symbol,
            self.settings.timeframe,
            self.settings.candle_limit,
        );
        series.extend(bars);
        debug!(symbol, bars = series.len(), last = ?series.last_close(), "Snapshot refreshed");

        self.snapshot = Some(MarketSnapshot {
            series,
            fetched_at: now,
        });
        self.refreshed_minute = Some(epoch_minute(now));
        Ok(true)
    }

    /// The snapshot for `symbol`, if present and fresh enough.
    pub fn get(&self, symbol: &str, now: DateTime<Utc>) -> TradingResult<&MarketSnapshot> {
        let snap = self
            .snapshot
            .as_ref()
            .filter(|s| s.symbol() == symbol)
            .ok_or_else(|| TradingError::DataUnavailable(format!("no snapshot for {}", symbol)))?;

        let age = snap.age_secs(now);
        if age > self.settings.max_snapshot_age_secs {
            return Err(TradingError::DataUnavailable(format!(
                "snapshot for {} is {}s old",
                symbol, age
            )));
        }
        if snap.series.is_empty() {
            return Err(TradingError::DataUnavailable(format!(
                "empty snapshot for {}",
                symbol
            )));
        }
        Ok(snap)
    }

    /// Last close for `symbol`, if the snapshot is usable.
    pub fn latest_price(&self, symbol: &str, now: DateTime<Utc>) -> TradingResult<Decimal> {
        self.get(symbol, now)?
            .last_price()
            .ok_or_else(|| TradingError::DataUnavailable(format!("bad last close for {}", symbol)))
    }

    /// Whatever is cached, regardless of age. Used for status reporting.
    pub fn peek(&self) -> Option<&MarketSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
        self.refreshed_minute = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use runner_core::{
        Bar, ExchangeError, MarketOrder, OrderReport, SymbolFilters, Venue,
    };
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    struct Feed {
        calls: AtomicUsize,
        fail: AtomicBool,
    }

    impl Feed {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Exchange for Feed {
        fn venue(&self) -> Venue {
            Venue::Spot
        }

        fn name(&self) -> &str {
            "feed"
        }

        async fn fetch_recent_candles(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            limit: usize,
        ) -> Result<Vec<Bar>, ExchangeError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ExchangeError::Timeout("klines".into()));
            }
            Ok((0..limit.min(10))
                .map(|i| Bar::flat(i as i64 * 60_000, 100.0 + n as f64))
                .collect())
        }

        async fn get_free_balance(&self, _asset: &str) -> Result<Decimal, ExchangeError> {
            Ok(Decimal::ZERO)
        }

        async fn get_symbol_filters(&self, _symbol: &str) -> Result<SymbolFilters, ExchangeError> {
            Ok(SymbolFilters::default())
        }

        async fn submit_market_order(
            &self,
            _order: MarketOrder,
        ) -> Result<OrderReport, ExchangeError> {
            Err(ExchangeError::OrderRejected("read-only".into()))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 5).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_once_per_minute() {
        let feed = Feed::new();
        let mut cache = MarketSnapshotCache::default();

        assert!(cache.refresh(&feed, "BTCUSDT", t0()).await.unwrap());
        assert!(!cache
            .refresh(&feed, "BTCUSDT", t0() + Duration::seconds(50))
            .await
            .unwrap());
        assert_eq!(feed.calls.load(Ordering::SeqCst), 1);

        // minute rollover
        assert!(cache
            .refresh(&feed, "BTCUSDT", t0() + Duration::seconds(56))
            .await
            .unwrap());
        assert_eq!(
            cache.latest_price("BTCUSDT", t0() + Duration::seconds(56)).unwrap(),
            dec!(101)
        );
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous() {
        let feed = Feed::new();
        let mut cache = MarketSnapshotCache::default();
        cache.refresh(&feed, "BTCUSDT", t0()).await.unwrap();

        feed.fail.store(true, Ordering::SeqCst);
        let later = t0() + Duration::seconds(70);
        let err = cache.refresh(&feed, "BTCUSDT", later).await.unwrap_err();
        assert_eq!(err.kind(), runner_core::ErrorKind::NetworkFailure);

        // stale but usable
        assert_eq!(cache.latest_price("BTCUSDT", later).unwrap(), dec!(100));
        // and retried on the next tick of the same minute
        assert!(cache.needs_refresh("BTCUSDT", later + Duration::seconds(5)));
    }

    #[tokio::test]
    async fn test_stale_and_wrong_symbol_unavailable() {
        let feed = Feed::new();
        let mut cache = MarketSnapshotCache::default();
        cache.refresh(&feed, "BTCUSDT", t0()).await.unwrap();

        assert!(cache.get("ETHUSDT", t0()).is_err());
        assert!(cache.get("BTCUSDT", t0() + Duration::seconds(301)).is_err());
        assert!(cache.get("BTCUSDT", t0() + Duration::seconds(300)).is_ok());
    }

    #[tokio::test]
    async fn test_symbol_switch_discards() {
        let feed = Feed::new();
        let mut cache = MarketSnapshotCache::default();
        cache.refresh(&feed, "BTCUSDT", t0()).await.unwrap();

        feed.fail.store(true, Ordering::SeqCst);
        assert!(cache.needs_refresh("ETHUSDT", t0()));
        assert!(cache.refresh(&feed, "ETHUSDT", t0()).await.is_err());
        assert!(cache.peek().is_none());
    }
}
