//! Wiring shared by `run` and `paper`: engine, scheduler and a control surface.

use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use runner_config::AppConfig;
use runner_core::Exchange;
use runner_engine::{
    ControlHandle, FanoutNotifier, Scheduler, TracingNotifier, TradingContext, TradingEngine,
};
use runner_monitor::{Dashboard, DashboardState, EventFeed};
use runner_signals::SignalRegistry;

use crate::console::{self, ConsoleCommand};

pub struct SessionOptions {
    pub start_enabled: bool,
    pub dashboard: bool,
}

/// Run the scheduler until the operator quits or Ctrl-C; returns the final context.
pub async fn run_session(
    config: &AppConfig,
    exchange: Arc<dyn Exchange>,
    options: SessionOptions,
) -> Result<TradingContext> {
    let signal = SignalRegistry::new()
        .create(&config.signal.name, config.signal.params.clone())
        .with_context(|| format!("Failed to create entry signal '{}'", config.signal.name))?;

    let feed = EventFeed::default();
    let notifier = FanoutNotifier::new()
        .with(Arc::new(TracingNotifier))
        .with(Arc::new(feed.clone()));
    let engine = TradingEngine::new(config.engine_config(), exchange, signal, Arc::new(notifier));
    let signal_name = engine.signal_name().to_string();

    let mut ctx = TradingContext::new(config.symbol(), config.snapshot_settings(), Utc::now());
    if options.start_enabled || config.trading.start_enabled {
        ctx = ctx.enabled();
    }

    let mut scheduler_config = config.scheduler_config();
    if options.dashboard {
        // raw mode swallows Ctrl-C; 'q' ends the session instead
        scheduler_config = scheduler_config.without_ctrl_c();
    }
    let scheduler = Scheduler::new(engine, ctx, scheduler_config);
    let handle = scheduler.handle();
    let status = scheduler.status_receiver();
    let mut task = tokio::spawn(scheduler.run());

    if options.dashboard {
        let keys = handle.clone();
        let ui = tokio::task::spawn_blocking(move || {
            let rt = tokio::runtime::Handle::current();
            Dashboard::new(250).run(
                || DashboardState {
                    status: Some(status.borrow().clone()).filter(|s| s.ticks > 0),
                    signal_name: signal_name.clone(),
                    messages: feed.lines(),
                },
                |key| {
                    let command = match key {
                        'g' => ConsoleCommand::Go,
                        's' => ConsoleCommand::Stop,
                        'f' => ConsoleCommand::Flatten,
                        _ => return,
                    };
                    rt.block_on(execute_quiet(&keys, command));
                },
            )
        });
        ui.await.context("Dashboard task failed")??;
        handle.shutdown().await.ok();
        return task.await.context("Scheduler task failed");
    }

    println!("{}", console::HELP);
    let mut lines = spawn_stdin_reader();
    let ctx = loop {
        tokio::select! {
            result = &mut task => break result.context("Scheduler task failed")?,
            line = lines.recv() => {
                let Some(line) = line else {
                    // stdin closed: keep trading until Ctrl-C
                    break (&mut task).await.context("Scheduler task failed")?;
                };
                match console::parse(&line) {
                    Ok(None) => {}
                    Ok(Some(ConsoleCommand::Quit)) => {
                        handle.shutdown().await.ok();
                        break (&mut task).await.context("Scheduler task failed")?;
                    }
                    Ok(Some(command)) => println!("{}", execute(&handle, command).await),
                    Err(msg) => println!("{}", msg),
                }
            }
        }
    };
    Ok(ctx)
}

/// Print the session summary and warn about anything left open.
pub fn report(ctx: &TradingContext) {
    println!();
    println!("{}", ctx.journal.summary().render());
    if let Some(position) = &ctx.position {
        warn!(
            symbol = %position.symbol,
            direction = %position.direction,
            quantity = %position.quantity,
            "Session ended with an open position; it is not rediscovered on restart"
        );
    }
    info!(ticks = ctx.ticks, trades = ctx.journal.len(), "Session finished");
}

/// Blocking reads on a dedicated thread, as tokio recommends for interactive stdin.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        }
    });
    rx
}

async fn execute(handle: &ControlHandle, command: ConsoleCommand) -> String {
    let result = match command {
        ConsoleCommand::Go => handle
            .enable_trading()
            .await
            .map(|_| "trading enabled".to_string()),
        ConsoleCommand::Stop => handle
            .disable_trading()
            .await
            .map(|_| "trading disabled; an open position is still managed".to_string()),
        ConsoleCommand::Status => handle.get_status().await.map(|s| s.render()),
        ConsoleCommand::Symbol(symbol) => handle
            .set_symbol(symbol.as_str())
            .await
            .map(|_| format!("symbol set to {}", symbol.to_uppercase())),
        ConsoleCommand::Flatten => handle.flatten().await.map(|trade| match trade {
            Some(trade) => format!(
                "closed {} {} @ {} pnl {:.2}",
                trade.direction, trade.symbol, trade.exit_price, trade.pnl
            ),
            None => "no open position".to_string(),
        }),
        ConsoleCommand::Help => Ok(console::HELP.to_string()),
        ConsoleCommand::Quit => Ok(String::new()),
    };
    result.unwrap_or_else(|e| format!("error: {}", e))
}

/// Dashboard variant: results go to the log, not the screen.
async fn execute_quiet(handle: &ControlHandle, command: ConsoleCommand) {
    let outcome = execute(handle, command).await;
    info!(outcome = %outcome, "Dashboard command");
}
