//! Tick driver: the single owner of the trading context.
//!
//! Ticks, control commands and symbol rankings all funnel into one loop, so
//! the context is only ever mutated between ticks and never concurrently.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use runner_core::{ClosedTrade, TradingResult};

use crate::context::{StatusSnapshot, TradingContext};
use crate::engine::TradingEngine;
use crate::error::ControlError;

const COMMAND_BUFFER: usize = 32;

/// Cadence of the two schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub scan_interval: Duration,
    /// Stop the loop on Ctrl-C
    pub handle_ctrl_c: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(5),
            scan_interval: Duration::from_secs(60 * 60),
            handle_ctrl_c: true,
        }
    }
}

impl SchedulerConfig {
    pub fn new(tick_interval: Duration, scan_interval: Duration) -> Self {
        Self {
            tick_interval,
            scan_interval,
            ..Default::default()
        }
    }

    /// Leave Ctrl-C to the caller.
    pub fn without_ctrl_c(mut self) -> Self {
        self.handle_ctrl_c = false;
        self
    }
}

/// Requests applied by the loop between ticks.
#[derive(Debug)]
pub enum ControlCommand {
    Enable(oneshot::Sender<()>),
    Disable(oneshot::Sender<()>),
    Status(oneshot::Sender<StatusSnapshot>),
    SetSymbol(String, oneshot::Sender<Result<(), ControlError>>),
    Flatten(oneshot::Sender<Result<Option<ClosedTrade>, ControlError>>),
    /// Top symbol from the ranking lane; applied only while flat
    Ranked(String),
    Shutdown,
}

/// Cloneable front end to a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::Sender<ControlCommand>,
}

impl ControlHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> ControlCommand,
    ) -> Result<T, ControlError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| ControlError::EngineStopped)?;
        reply_rx.await.map_err(|_| ControlError::EngineStopped)
    }

    pub async fn enable_trading(&self) -> Result<(), ControlError> {
        self.request(ControlCommand::Enable).await
    }

    /// Stop new entries. An open position is still managed.
    pub async fn disable_trading(&self) -> Result<(), ControlError> {
        self.request(ControlCommand::Disable).await
    }

    pub async fn get_status(&self) -> Result<StatusSnapshot, ControlError> {
        self.request(ControlCommand::Status).await
    }

    /// Switch the target symbol; rejected while a position is open.
    pub async fn set_symbol(&self, symbol: impl Into<String>) -> Result<(), ControlError> {
        let symbol = symbol.into();
        self.request(|reply| ControlCommand::SetSymbol(symbol, reply))
            .await?
    }

    /// Close the open position now. `None` when already flat.
    pub async fn flatten(&self) -> Result<Option<ClosedTrade>, ControlError> {
        self.request(ControlCommand::Flatten).await?
    }

    pub async fn shutdown(&self) -> Result<(), ControlError> {
        self.tx
            .send(ControlCommand::Shutdown)
            .await
            .map_err(|_| ControlError::EngineStopped)
    }
}

/// Picks the symbol to trade next.
#[async_trait]
pub trait SymbolRanker: Send + Sync {
    fn name(&self) -> &str;

    /// Best candidate right now, if any.
    async fn top_symbol(&self) -> TradingResult<Option<String>>;
}

/// Never proposes a switch.
#[derive(Debug, Clone, Default)]
pub struct FixedSymbol;

#[async_trait]
impl SymbolRanker for FixedSymbol {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn top_symbol(&self) -> TradingResult<Option<String>> {
        Ok(None)
    }
}

enum Flow {
    Continue,
    Stop,
}

pub struct Scheduler {
    engine: TradingEngine,
    ctx: TradingContext,
    config: SchedulerConfig,
    ranker: Arc<dyn SymbolRanker>,
    tx: mpsc::Sender<ControlCommand>,
    rx: mpsc::Receiver<ControlCommand>,
    status_tx: watch::Sender<StatusSnapshot>,
}

impl Scheduler {
    pub fn new(engine: TradingEngine, ctx: TradingContext, config: SchedulerConfig) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let (status_tx, _) = watch::channel(engine.status(&ctx, Utc::now()));
        Self {
            engine,
            ctx,
            config,
            ranker: Arc::new(FixedSymbol),
            tx,
            rx,
            status_tx,
        }
    }

    /// Set the symbol ranker for the ranking lane.
    pub fn with_ranker(mut self, ranker: Arc<dyn SymbolRanker>) -> Self {
        self.ranker = ranker;
        self
    }

    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    /// Status published after every tick and command.
    pub fn status_receiver(&self) -> watch::Receiver<StatusSnapshot> {
        self.status_tx.subscribe()
    }

    /// Run until shutdown; returns the final context.
    pub async fn run(mut self) -> TradingContext {
        info!(
            symbol = %self.ctx.symbol,
            venue = %self.engine.venue(),
            signal = self.engine.signal_name(),
            ranker = self.ranker.name(),
            tick_ms = self.config.tick_interval.as_millis() as u64,
            "Scheduler started"
        );

        let ranking = self.spawn_ranking();
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let handle_ctrl_c = self.config.handle_ctrl_c;
        let ctrl_c = async {
            if handle_ctrl_c {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "Could not listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            } else {
                std::future::pending::<()>().await;
            }
        };
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let action = self.engine.tick(&mut self.ctx, now).await;
                    debug!(?action, "Tick done");
                    self.publish();
                }
                command = self.rx.recv() => {
                    let Some(command) = command else { break };
                    if let Flow::Stop = self.apply(command).await {
                        break;
                    }
                    self.publish();
                }
                _ = &mut ctrl_c => {
                    info!("Ctrl-C received");
                    break;
                }
            }
        }

        if let Some(ranking) = ranking {
            ranking.abort();
        }
        info!(
            ticks = self.ctx.ticks,
            trades = self.ctx.journal.len(),
            holding = self.ctx.position.is_some(),
            "Scheduler stopped"
        );
        self.ctx
    }

    /// Ranking runs on its own task so a slow fetch never delays a tick.
    fn spawn_ranking(&self) -> Option<JoinHandle<()>> {
        if self.config.scan_interval.is_zero() {
            return None;
        }
        let ranker = Arc::clone(&self.ranker);
        let tx = self.tx.clone();
        let period = self.config.scan_interval;

        Some(tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                match ranker.top_symbol().await {
                    Ok(Some(symbol)) => {
                        if tx.send(ControlCommand::Ranked(symbol)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!(ranker = ranker.name(), error = %e, "Symbol ranking failed"),
                }
            }
        }))
    }

    async fn apply(&mut self, command: ControlCommand) -> Flow {
        let now = Utc::now();
        match command {
            ControlCommand::Enable(reply) => {
                self.engine.enable(&mut self.ctx);
                let _ = reply.send(());
            }
            ControlCommand::Disable(reply) => {
                self.engine.disable(&mut self.ctx);
                let _ = reply.send(());
            }
            ControlCommand::Status(reply) => {
                let _ = reply.send(self.engine.status(&self.ctx, now));
            }
            ControlCommand::SetSymbol(symbol, reply) => {
                let result = self.engine.set_symbol(&mut self.ctx, &symbol);
                if let Err(e) = &result {
                    info!(symbol = %symbol, error = %e, "Symbol change rejected");
                }
                let _ = reply.send(result);
            }
            ControlCommand::Flatten(reply) => {
                let result = self
                    .engine
                    .flatten(&mut self.ctx, now)
                    .await
                    .map_err(ControlError::from);
                let _ = reply.send(result);
            }
            ControlCommand::Ranked(symbol) => {
                if self.ctx.position.is_some() || symbol.eq_ignore_ascii_case(&self.ctx.symbol) {
                    debug!(symbol = %symbol, "Ranked symbol not applied");
                } else if let Err(e) = self.engine.set_symbol(&mut self.ctx, &symbol) {
                    warn!(symbol = %symbol, error = %e, "Ranked symbol rejected");
                }
            }
            ControlCommand::Shutdown => {
                info!("Shutdown requested");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    fn publish(&self) {
        self.status_tx
            .send_replace(self.engine.status(&self.ctx, Utc::now()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runner_core::{
        BarSeries, Direction, EntryDecision, EntrySignal, Event, Position,
    };
    use runner_data::SnapshotSettings;
    use runner_exchange::PaperExchange;
    use rust_decimal_macros::dec;
    use crate::config::EngineConfig;

    struct Never;

    impl EntrySignal for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn evaluate(&self, _series: &BarSeries) -> EntryDecision {
            EntryDecision::none()
        }

        fn warmup_period(&self) -> usize {
            1
        }
    }

    struct Top(&'static str);

    #[async_trait]
    impl SymbolRanker for Top {
        fn name(&self) -> &str {
            "top"
        }

        async fn top_symbol(&self) -> TradingResult<Option<String>> {
            Ok(Some(self.0.to_string()))
        }
    }

    fn fast_config(scan_ms: u64) -> SchedulerConfig {
        SchedulerConfig::new(Duration::from_millis(10), Duration::from_millis(scan_ms))
            .without_ctrl_c()
    }

    fn scheduler(paper: &PaperExchange, config: SchedulerConfig) -> Scheduler {
        let engine = TradingEngine::new(
            EngineConfig::default(),
            Arc::new(paper.clone()),
            Box::new(Never),
            Arc::new(|_: &Event| {}),
        );
        let ctx = TradingContext::new("BTCUSDT", SnapshotSettings::default(), Utc::now());
        Scheduler::new(engine, ctx, config)
    }

    #[tokio::test]
    async fn test_commands_between_ticks() {
        let paper = PaperExchange::spot(dec!(1000));
        paper.set_price("BTCUSDT", 100.0);
        let scheduler = scheduler(&paper, fast_config(0));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        let status = handle.get_status().await.unwrap();
        assert!(!status.trading_enabled);

        handle.enable_trading().await.unwrap();
        handle.set_symbol("ethusdt").await.unwrap();
        let status = handle.get_status().await.unwrap();
        assert!(status.trading_enabled);
        assert_eq!(status.symbol, "ETHUSDT");

        assert!(handle.flatten().await.unwrap().is_none());
        handle.shutdown().await.unwrap();

        let ctx = task.await.unwrap();
        assert_eq!(ctx.symbol, "ETHUSDT");
        assert!(ctx.trading_enabled);
    }

    #[tokio::test]
    async fn test_ticks_publish_status() {
        let paper = PaperExchange::spot(dec!(1000));
        paper.set_price("BTCUSDT", 100.0);
        let scheduler = scheduler(&paper, fast_config(0));
        let handle = scheduler.handle();
        let mut status = scheduler.status_receiver();
        let task = tokio::spawn(scheduler.run());

        status.changed().await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        let latest = status.borrow().clone();
        assert!(latest.ticks >= 1);
        assert_eq!(latest.price, Some(dec!(100)));

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_ranked_symbol_applied_when_flat() {
        let paper = PaperExchange::spot(dec!(1000));
        let scheduler = scheduler(&paper, fast_config(10)).with_ranker(Arc::new(Top("SOLUSDT")));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.get_status().await.unwrap().symbol, "SOLUSDT");

        handle.shutdown().await.unwrap();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_symbol_held_while_position_open() {
        let paper = PaperExchange::spot(dec!(1000));
        let mut scheduler =
            scheduler(&paper, fast_config(10)).with_ranker(Arc::new(Top("SOLUSDT")));
        scheduler.ctx.position = Some(Position::open(
            "BTCUSDT",
            Direction::Long,
            dec!(1),
            dec!(100),
            dec!(99),
            Utc::now(),
        ));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        assert_eq!(
            handle.set_symbol("ETHUSDT").await,
            Err(ControlError::PositionOpen("BTCUSDT".into()))
        );
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(handle.get_status().await.unwrap().symbol, "BTCUSDT");

        handle.shutdown().await.unwrap();
        let ctx = task.await.unwrap();
        assert!(ctx.position.is_some());
    }

    #[tokio::test]
    async fn test_handle_after_stop() {
        let paper = PaperExchange::spot(dec!(1000));
        let scheduler = scheduler(&paper, fast_config(0));
        let handle = scheduler.handle();
        let task = tokio::spawn(scheduler.run());

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        assert_eq!(
            handle.enable_trading().await,
            Err(ControlError::EngineStopped)
        );
    }
}
