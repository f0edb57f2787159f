//! The trading engine: one serial tick over the trading context.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use runner_core::{
    ClosedTrade, Direction, EntrySignal, ErrorKind, Event, Exchange, ExitReason, Notifier,
    Position, TradingError, TradingResult, Venue,
};

use crate::config::EngineConfig;
use crate::context::{StatusSnapshot, TradingContext};
use crate::error::ControlError;
use crate::execution::{ExecutionAdapter, ExitFill};
use crate::machine::{MarketTick, PositionMachine};

/// What a tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    /// Nothing to do: flat and no entry, disabled, cooling down or no data
    Idle,
    /// Position held, levels updated
    Held,
    FastModeActivated,
    Opened(Direction),
    Closed(ExitReason),
    /// Exit order filled in part; the rest stays held and is retried
    PartiallyClosed(ExitReason),
    /// The tick failed; the error was logged and reported
    Failed(ErrorKind),
}

/// Runs ticks against one exchange with one entry signal.
pub struct TradingEngine {
    config: EngineConfig,
    exchange: Arc<dyn Exchange>,
    signal: Box<dyn EntrySignal>,
    machine: PositionMachine,
    execution: ExecutionAdapter,
    notifier: Arc<dyn Notifier>,
}

impl TradingEngine {
    pub fn new(
        config: EngineConfig,
        exchange: Arc<dyn Exchange>,
        signal: Box<dyn EntrySignal>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let machine = PositionMachine::new(
            config.levels.clone(),
            config.fast_window_secs,
            config.pump_lookback_bars,
            config.pump_pct,
        );
        let execution = ExecutionAdapter::new(
            Arc::clone(&exchange),
            config.allocation.clone(),
            config.leverage.clone(),
            config.margin_type,
            config.quote_asset.clone(),
        );
        Self {
            config,
            exchange,
            signal,
            machine,
            execution,
            notifier,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn venue(&self) -> Venue {
        self.exchange.venue()
    }

    pub fn signal_name(&self) -> &str {
        self.signal.name()
    }

    /// Send an event to the notification sink.
    pub fn notify(&self, event: Event) {
        self.notifier.notify(&event);
    }

    /// One tick. Errors are caught here: logged, reported to the sink and
    /// stored on the context. The caller never sees them.
    #[instrument(skip_all, fields(tick = ctx.ticks + 1))]
    pub async fn tick(&self, ctx: &mut TradingContext, now: DateTime<Utc>) -> TickAction {
        ctx.ticks += 1;
        match self.run_tick(ctx, now).await {
            Ok(action) => action,
            Err(err) => {
                self.report_error(ctx, &err, now);
                TickAction::Failed(err.kind())
            }
        }
    }

    fn report_error(&self, ctx: &mut TradingContext, err: &TradingError, now: DateTime<Utc>) {
        if err.is_order_failure() {
            warn!(
                kind = ?err.kind(),
                error = %err,
                symbol = %ctx.active_symbol(),
                holding = ctx.position.is_some(),
                "Order not confirmed, position record unchanged"
            );
        } else {
            warn!(kind = ?err.kind(), error = %err, symbol = %ctx.active_symbol(), "Tick failed");
        }
        self.notify(Event::Error {
            kind: err.kind(),
            message: err.to_string(),
        });
        ctx.last_error = Some((now, err.clone()));
    }

    async fn run_tick(&self, ctx: &mut TradingContext, now: DateTime<Utc>) -> TradingResult<TickAction> {
        self.check_auto_shutdown(ctx, now);

        let symbol = ctx.active_symbol().to_string();
        let refresh_err = ctx
            .cache
            .refresh(self.exchange.as_ref(), &symbol, now)
            .await
            .err();

        // no usable data: never act on it
        let price = match ctx.cache.latest_price(&symbol, now) {
            Ok(price) => price,
            Err(e) => return Err(refresh_err.unwrap_or(e)),
        };
        let (closes, decision) = match ctx.cache.get(&symbol, now) {
            Ok(snapshot) => {
                // the signal only runs when an entry is possible
                let decision = (ctx.position.is_none() && self.entry_allowed(ctx, now))
                    .then(|| {
                        let series = &snapshot.series;
                        if self.signal.is_warmed_up(series.len()) {
                            Some(self.signal.evaluate(series))
                        } else {
                            debug!(
                                bars = series.len(),
                                warmup = self.signal.warmup_period(),
                                "Signal warming up"
                            );
                            None
                        }
                    })
                    .flatten();
                (snapshot.series.closes(), decision)
            }
            Err(e) => return Err(refresh_err.unwrap_or(e)),
        };

        if let Some(err) = refresh_err {
            // stale but usable snapshot; report and carry on
            self.report_error(ctx, &err, now);
        }

        if let Some(position) = ctx.position.clone() {
            return self.manage(ctx, position, price, &closes, now).await;
        }

        match decision {
            Some(decision) => match decision.direction {
                Some(direction) => self.enter(ctx, direction, decision.reasons, price, now).await,
                None => Ok(TickAction::Idle),
            },
            None => Ok(TickAction::Idle),
        }
    }

    fn entry_allowed(&self, ctx: &TradingContext, now: DateTime<Utc>) -> bool {
        ctx.trading_enabled && !ctx.cooldown_active(now, self.config.cooldown_secs)
    }

    fn check_auto_shutdown(&self, ctx: &mut TradingContext, now: DateTime<Utc>) {
        let Some(horizon) = self.config.auto_shutdown_secs() else {
            return;
        };
        if ctx.auto_shutdown_fired || now - ctx.session_start < Duration::seconds(horizon) {
            return;
        }
        ctx.auto_shutdown_fired = true;
        ctx.trading_enabled = false;
        info!(
            days = self.config.auto_shutdown_days,
            holding = ctx.position.is_some(),
            "Auto-shutdown reached, entries disabled"
        );
        self.notify(Event::AutoShutdown {
            after_days: self.config.auto_shutdown_days,
        });
    }

    async fn manage(
        &self,
        ctx: &mut TradingContext,
        position: Position,
        price: Decimal,
        closes: &[f64],
        now: DateTime<Utc>,
    ) -> TradingResult<TickAction> {
        let step = self.machine.step(&position, &MarketTick { price, closes, now });

        match step.exit {
            None => {
                if step.fast_activated {
                    info!(
                        symbol = %step.next.symbol,
                        %price,
                        stop = %step.next.stop_price,
                        "Fast mode activated"
                    );
                    self.notify(Event::FastModeActivated {
                        symbol: step.next.symbol.clone(),
                        price,
                        stop_price: step.next.stop_price,
                    });
                } else if step.stop_moved {
                    debug!(symbol = %step.next.symbol, stop = %step.next.stop_price, "Stop raised");
                }
                let action = if step.fast_activated {
                    TickAction::FastModeActivated
                } else {
                    TickAction::Held
                };
                ctx.position = Some(step.next);
                Ok(action)
            }
            Some(reason) => {
                info!(
                    symbol = %position.symbol,
                    %reason,
                    %price,
                    stop = %step.next.stop_price,
                    "Exit triggered"
                );
                let trade = self.close(ctx, &step.next, reason, price, now).await?;
                Ok(match ctx.position {
                    Some(_) => TickAction::PartiallyClosed(trade.reason),
                    None => TickAction::Closed(trade.reason),
                })
            }
        }
    }

    /// Close `position` and clear the slot once the venue confirms. A partial
    /// fill journals the executed part and keeps the remainder.
    async fn close(
        &self,
        ctx: &mut TradingContext,
        position: &Position,
        reason: ExitReason,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> TradingResult<ClosedTrade> {
        let (trade, remainder) = match self.execution.close(position, price).await? {
            ExitFill::Filled {
                quantity,
                price: fill_price,
                remaining,
            } => {
                let mut closed = position.clone();
                closed.quantity = quantity;
                let remainder = (remaining > Decimal::ZERO).then(|| {
                    let mut rest = position.clone();
                    rest.quantity = remaining;
                    rest
                });
                (
                    ClosedTrade::from_position(&closed, fill_price, now, reason),
                    remainder,
                )
            }
            ExitFill::AlreadyFlat => {
                warn!(symbol = %position.symbol, "Position already flat on venue, clearing record");
                (
                    ClosedTrade::from_position(position, price, now, ExitReason::External),
                    None,
                )
            }
        };

        if let Some(rest) = &remainder {
            warn!(
                symbol = %rest.symbol,
                remaining = %rest.quantity,
                "Exit partially filled, keeping the remainder"
            );
        } else {
            ctx.last_exit = Some(now);
        }
        ctx.position = remainder;
        ctx.journal.record(trade.clone());
        self.notify(Event::PositionClosed {
            trade: trade.clone(),
        });
        Ok(trade)
    }

    async fn enter(
        &self,
        ctx: &mut TradingContext,
        direction: Direction,
        reasons: Vec<String>,
        price: Decimal,
        now: DateTime<Utc>,
    ) -> TradingResult<TickAction> {
        let symbol = ctx.symbol.clone();
        if self.venue() == Venue::Spot && direction == Direction::Short {
            debug!(symbol = %symbol, "Short signal ignored on spot");
            self.notify(Event::EntrySkipped {
                symbol,
                reason: "spot accepts long entries only".into(),
            });
            return Ok(TickAction::Idle);
        }

        info!(symbol = %symbol, %direction, %price, reasons = ?reasons, "Entry signal fired");
        let fill = self.execution.open(&symbol, direction, price).await?;

        let stop = self.config.levels.initial_stop(fill.price, direction);
        let position = Position::open(&symbol, direction, fill.quantity, fill.price, stop, now)
            .with_leverage(fill.leverage);
        info!(
            symbol = %symbol,
            %direction,
            quantity = %position.quantity,
            entry = %position.entry_price,
            stop = %position.stop_price,
            "Position opened"
        );

        ctx.position = Some(position.clone());
        self.notify(Event::PositionOpened { position, reasons });
        Ok(TickAction::Opened(direction))
    }

    /// Operator-requested full exit, same path as a stop exit.
    pub async fn flatten(
        &self,
        ctx: &mut TradingContext,
        now: DateTime<Utc>,
    ) -> TradingResult<Option<ClosedTrade>> {
        let Some(position) = ctx.position.clone() else {
            return Ok(None);
        };
        let price = ctx
            .cache
            .peek()
            .filter(|s| s.symbol() == position.symbol)
            .and_then(|s| s.last_price())
            .unwrap_or(position.entry_price);

        info!(symbol = %position.symbol, %price, "Manual flatten requested");
        match self.close(ctx, &position, ExitReason::Manual, price, now).await {
            Ok(trade) => Ok(Some(trade)),
            Err(err) => {
                self.report_error(ctx, &err, now);
                Err(err)
            }
        }
    }

    /// Enable entries.
    pub fn enable(&self, ctx: &mut TradingContext) {
        if !ctx.trading_enabled {
            ctx.trading_enabled = true;
            info!(symbol = %ctx.symbol, "Trading enabled");
            self.notify(Event::TradingEnabled);
        }
    }

    /// Disable entries. An open position is still managed to exit.
    pub fn disable(&self, ctx: &mut TradingContext) {
        if ctx.trading_enabled {
            ctx.trading_enabled = false;
            info!(holding = ctx.position.is_some(), "Trading disabled");
            self.notify(Event::TradingDisabled);
        }
    }

    /// Switch the target symbol while flat.
    pub fn set_symbol(
        &self,
        ctx: &mut TradingContext,
        symbol: &str,
    ) -> Result<(), ControlError> {
        if let Some(previous) = ctx.set_symbol(symbol)? {
            info!(from = %previous, to = %ctx.symbol, "Symbol changed");
            self.notify(Event::SymbolChanged {
                from: previous,
                to: ctx.symbol.clone(),
            });
        }
        Ok(())
    }

    /// Point-in-time status.
    pub fn status(&self, ctx: &TradingContext, now: DateTime<Utc>) -> StatusSnapshot {
        let symbol = ctx.active_symbol().to_string();
        let snapshot = ctx.cache.peek().filter(|s| s.symbol() == symbol);
        let price = snapshot.and_then(|s| s.last_price());
        let cooldown_remaining_secs = ctx
            .last_exit
            .map(|exit| self.config.cooldown_secs - (now - exit).num_seconds())
            .unwrap_or_default()
            .max(0);

        StatusSnapshot {
            time: now,
            venue: self.venue(),
            exchange: self.exchange.name().to_string(),
            leverage: self.execution.leverage_for(&symbol),
            symbol,
            price,
            snapshot_age_secs: snapshot.map(|s| s.age_secs(now)),
            unrealized_pnl: ctx
                .position
                .as_ref()
                .zip(price)
                .map(|(p, price)| p.pnl_at(price)),
            position: ctx.position.clone(),
            trading_enabled: ctx.trading_enabled,
            cooldown_remaining_secs,
            journal: ctx.journal.summary(),
            last_error: ctx
                .last_error
                .as_ref()
                .map(|(_, e)| (e.kind(), e.to_string())),
            ticks: ctx.ticks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use runner_core::{BarSeries, EntryDecision, ExchangeError};
    use runner_data::SnapshotSettings;
    use runner_exchange::PaperExchange;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;

    const SYMBOL: &str = "BTCUSDT";

    /// Fires whatever direction the test sets.
    struct Scripted(Arc<Mutex<Option<Direction>>>);

    impl EntrySignal for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn evaluate(&self, _series: &BarSeries) -> EntryDecision {
            match *self.0.lock().unwrap() {
                Some(direction) => EntryDecision::enter(direction, vec!["scripted".into()]),
                None => EntryDecision::none(),
            }
        }

        fn warmup_period(&self) -> usize {
            1
        }
    }

    struct Harness {
        paper: PaperExchange,
        engine: TradingEngine,
        ctx: TradingContext,
        events: Arc<Mutex<Vec<Event>>>,
        fire: Arc<Mutex<Option<Direction>>>,
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn harness(paper: PaperExchange, config: EngineConfig) -> Harness {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let events = Arc::clone(&events);
            move |e: &Event| events.lock().unwrap().push(e.clone())
        };
        let fire = Arc::new(Mutex::new(None));
        let engine = TradingEngine::new(
            config,
            Arc::new(paper.clone()),
            Box::new(Scripted(Arc::clone(&fire))),
            Arc::new(sink),
        );
        let ctx = TradingContext::new(SYMBOL, SnapshotSettings::default(), t0()).enabled();
        Harness {
            paper,
            engine,
            ctx,
            events,
            fire,
        }
    }

    fn spot(balance: Decimal) -> Harness {
        harness(PaperExchange::spot(balance), EngineConfig::default())
    }

    impl Harness {
        fn price(&self, price: f64) {
            self.paper.set_price(SYMBOL, price);
        }

        fn fire(&self, direction: Option<Direction>) {
            *self.fire.lock().unwrap() = direction;
        }

        async fn tick(&mut self, secs: i64) -> TickAction {
            self.engine
                .tick(&mut self.ctx, t0() + Duration::seconds(secs))
                .await
        }

        fn position(&self) -> &Position {
            self.ctx.position.as_ref().expect("position open")
        }

        fn has_event(&self, pred: impl Fn(&Event) -> bool) -> bool {
            self.events.lock().unwrap().iter().any(pred)
        }

        /// Open a long at 100 on the first tick.
        async fn open_long_at_100(&mut self) {
            self.price(100.0);
            self.fire(Some(Direction::Long));
            assert_eq!(self.tick(0).await, TickAction::Opened(Direction::Long));
            self.fire(None);
        }
    }

    #[tokio::test]
    async fn test_entry_sets_initial_stop() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        let pos = h.position();
        assert_eq!(pos.entry_price, dec!(100));
        assert_eq!(pos.stop_price, dec!(99));
        assert_eq!(pos.extreme_price, dec!(100));
        assert_eq!(pos.quantity, dec!(9.8));
        assert!(!pos.fast_mode);
        assert!(h.has_event(|e| matches!(e, Event::PositionOpened { .. })));
    }

    #[tokio::test]
    async fn test_quick_target_activates_fast_mode() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        h.price(110.0);
        assert_eq!(h.tick(120).await, TickAction::FastModeActivated);
        let pos = h.position();
        assert!(pos.fast_mode);
        assert!(pos.stop_price >= dec!(109.8));
        assert!(h.has_event(|e| matches!(e, Event::FastModeActivated { .. })));
    }

    #[tokio::test]
    async fn test_stop_loss_closes_position() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        h.price(99.0);
        assert_eq!(h.tick(60).await, TickAction::Closed(ExitReason::Stop));
        assert!(h.ctx.position.is_none());
        assert_eq!(h.ctx.last_exit, Some(t0() + Duration::seconds(60)));

        let trade = h.ctx.journal.last().unwrap();
        assert_eq!(trade.reason, ExitReason::Stop);
        assert_eq!(trade.exit_price, dec!(99));
        assert_eq!(trade.pnl, dec!(-9.8));
    }

    #[tokio::test]
    async fn test_trailing_exit_after_run() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        h.price(110.0);
        h.tick(60).await;
        h.price(130.0);
        assert_eq!(h.tick(120).await, TickAction::Held);
        assert_eq!(h.position().stop_price, dec!(127.4));

        h.price(127.0);
        assert_eq!(h.tick(180).await, TickAction::Closed(ExitReason::Trailing));
        let trade = h.ctx.journal.last().unwrap();
        assert!(trade.fast_mode);
        assert_eq!(trade.exit_price, dec!(127));
    }

    #[tokio::test]
    async fn test_insufficient_balance_sends_nothing() {
        let mut h = spot(dec!(4));
        h.price(100.0);
        h.fire(Some(Direction::Long));

        assert_eq!(
            h.tick(0).await,
            TickAction::Failed(ErrorKind::InsufficientBalance)
        );
        assert!(h.ctx.position.is_none());
        assert!(h.paper.submitted_orders().is_empty());
        assert!(h.has_event(|e| matches!(
            e,
            Event::Error {
                kind: ErrorKind::InsufficientBalance,
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_entry_timeout_leaves_no_position() {
        let mut h = spot(dec!(1000));
        h.price(100.0);
        h.fire(Some(Direction::Long));
        h.paper.fail_next_order(ExchangeError::Timeout("order".into()));

        assert_eq!(h.tick(0).await, TickAction::Failed(ErrorKind::NetworkFailure));
        assert!(h.ctx.position.is_none());

        // next tick evaluates the signal again from scratch
        assert_eq!(h.tick(5).await, TickAction::Opened(Direction::Long));
        assert_eq!(h.paper.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_exit_keeps_position_and_retries() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;
        let before = h.position().clone();

        h.price(99.0);
        h.paper
            .fail_next_order(ExchangeError::Api {
                code: -1001,
                message: "Internal error".into(),
            });
        assert_eq!(h.tick(60).await, TickAction::Failed(ErrorKind::VenueRejected));
        assert_eq!(h.position(), &before);

        assert_eq!(h.tick(65).await, TickAction::Closed(ExitReason::Stop));
        assert!(h.ctx.position.is_none());
    }

    #[tokio::test]
    async fn test_cooldown_blocks_reentry() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;
        h.price(99.0);
        h.tick(60).await;

        h.fire(Some(Direction::Long));
        assert_eq!(h.tick(90).await, TickAction::Idle);
        assert!(h.ctx.position.is_none());
        assert_eq!(h.tick(120).await, TickAction::Opened(Direction::Long));
    }

    #[tokio::test]
    async fn test_single_position_slot() {
        let mut h = spot(dec!(1000));
        h.price(100.0);
        h.fire(Some(Direction::Long));

        assert_eq!(h.tick(0).await, TickAction::Opened(Direction::Long));
        for secs in [5, 10, 60, 65] {
            assert_eq!(h.tick(secs).await, TickAction::Held);
        }
        assert_eq!(h.paper.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_still_manages_exit() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;
        h.engine.disable(&mut h.ctx);

        h.price(99.0);
        assert_eq!(h.tick(60).await, TickAction::Closed(ExitReason::Stop));

        h.fire(Some(Direction::Long));
        assert_eq!(h.tick(600).await, TickAction::Idle);
        assert!(h.has_event(|e| matches!(e, Event::TradingDisabled)));
    }

    #[tokio::test]
    async fn test_stale_snapshot_usable_until_max_age() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        h.paper
            .fail_candles(Some(ExchangeError::Connection("reset".into())));
        h.price(99.0);
        // refresh fails, the old snapshot at 100 still drives the tick
        assert_eq!(h.tick(60).await, TickAction::Held);
        assert!(h.has_event(|e| matches!(
            e,
            Event::Error {
                kind: ErrorKind::NetworkFailure,
                ..
            }
        )));

        // too old: no action at all, position kept
        assert_eq!(h.tick(400).await, TickAction::Failed(ErrorKind::NetworkFailure));
        assert!(h.ctx.position.is_some());

        h.paper.fail_candles(None);
        assert_eq!(h.tick(460).await, TickAction::Closed(ExitReason::Stop));
    }

    #[tokio::test]
    async fn test_spot_ignores_short_signal() {
        let mut h = spot(dec!(1000));
        h.price(100.0);
        h.fire(Some(Direction::Short));

        assert_eq!(h.tick(0).await, TickAction::Idle);
        assert!(h.paper.submitted_orders().is_empty());
        assert!(h.has_event(|e| matches!(e, Event::EntrySkipped { .. })));
    }

    #[tokio::test]
    async fn test_futures_short_and_venue_flat() {
        let paper = PaperExchange::futures(dec!(1000));
        let mut h = harness(paper, EngineConfig::default());
        h.price(100.0);
        h.fire(Some(Direction::Short));

        assert_eq!(h.tick(0).await, TickAction::Opened(Direction::Short));
        h.fire(None);
        let pos = h.position();
        assert_eq!(pos.leverage, 10);
        assert_eq!(pos.stop_price, dec!(101));
        // 980 * 10 / 100
        assert_eq!(pos.quantity, dec!(98));

        // liquidated or closed by hand on the venue
        h.paper.clear_position(SYMBOL);
        h.price(101.0);
        assert_eq!(h.tick(60).await, TickAction::Closed(ExitReason::External));
        assert_eq!(
            h.ctx.journal.last().unwrap().reason,
            ExitReason::External
        );
        assert_eq!(h.paper.submitted_orders().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_exit_keeps_remainder() {
        let mut h = harness(PaperExchange::futures(dec!(1000)), EngineConfig::default());
        h.open_long_at_100().await;
        assert_eq!(h.position().quantity, dec!(98));

        h.paper.fill_next_partially(dec!(0.5));
        h.price(99.0);
        assert_eq!(h.tick(60).await, TickAction::PartiallyClosed(ExitReason::Stop));
        assert_eq!(h.position().quantity, dec!(49));
        assert_eq!(h.paper.venue_position(SYMBOL).unwrap().quantity, dec!(49));
        assert_eq!(h.ctx.journal.last().unwrap().quantity, dec!(49));
        assert!(h.ctx.last_exit.is_none());

        assert_eq!(h.tick(120).await, TickAction::Closed(ExitReason::Stop));
        assert!(h.ctx.position.is_none());
        assert!(h.paper.venue_position(SYMBOL).is_none());
        assert_eq!(h.ctx.journal.len(), 2);
    }

    #[tokio::test]
    async fn test_clock_resynced_before_entry_and_exit() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;
        assert_eq!(h.paper.clock_syncs(), 1);

        h.price(99.0);
        assert_eq!(h.tick(60).await, TickAction::Closed(ExitReason::Stop));
        assert_eq!(h.paper.clock_syncs(), 2);
        assert_eq!(h.paper.submitted_orders().len(), 2);
    }

    #[tokio::test]
    async fn test_auto_shutdown_announced_once() {
        let config = EngineConfig {
            auto_shutdown_days: 1,
            ..Default::default()
        };
        let mut h = harness(PaperExchange::spot(dec!(1000)), config);
        h.price(100.0);

        h.tick(86_400).await;
        assert!(!h.ctx.trading_enabled);
        h.engine.enable(&mut h.ctx);
        h.tick(86_460).await;
        assert!(h.ctx.trading_enabled);

        let count = h
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, Event::AutoShutdown { .. }))
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_manual_flatten() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        let trade = h
            .engine
            .flatten(&mut h.ctx, t0() + Duration::seconds(30))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(trade.reason, ExitReason::Manual);
        assert!(h.ctx.position.is_none());
        assert!(h.engine.flatten(&mut h.ctx, t0()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_reports_position() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;

        let status = h.engine.status(&h.ctx, t0() + Duration::seconds(10));
        assert_eq!(status.symbol, SYMBOL);
        assert_eq!(status.price, Some(dec!(100)));
        assert_eq!(status.snapshot_age_secs, Some(10));
        assert_eq!(status.unrealized_pnl, Some(Decimal::ZERO));
        assert_eq!(status.leverage, 1);
        assert!(status.trading_enabled);
        assert!(status.render().contains("LONG BTCUSDT"));
    }

    #[tokio::test]
    async fn test_set_symbol_rejected_while_holding() {
        let mut h = spot(dec!(1000));
        h.open_long_at_100().await;
        assert!(matches!(
            h.engine.set_symbol(&mut h.ctx, "ETHUSDT"),
            Err(ControlError::PositionOpen(_))
        ));
    }

    #[tokio::test]
    async fn test_no_data_is_a_no_op() {
        let mut h = spot(dec!(1000));
        h.fire(Some(Direction::Long));
        assert_eq!(h.tick(0).await, TickAction::Failed(ErrorKind::DataUnavailable));
        assert!(h.paper.submitted_orders().is_empty());
    }
}
