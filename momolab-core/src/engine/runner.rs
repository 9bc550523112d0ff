//! Async bar loop: pull a bar, process it to completion, emit its events.
//!
//! Cancellation is observed only while waiting for the next bar, so a bar
//! is never half-processed. Risk parameters are read from a watch channel
//! once per bar.

use futures::StreamExt;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::events::{ExitReason, TradeEvent};
use super::trader::MomentumTrader;
use crate::config::MomentumConfig;
use crate::data::{BarSource, EventSink, SinkError, StreamError};
use crate::domain::{Bar, BarError};
use crate::risk::RiskParams;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Stream(#[from] StreamError),
    #[error("event sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error("task for {symbol} aborted: {reason}")]
    Task { symbol: String, reason: String },
}

/// Per-run options that are not part of the shared config.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOptions {
    /// Per-trade risk fraction for this symbol, overriding the snapshot.
    pub risk_override: Option<f64>,
    /// Flatten an open position when the feed ends.
    pub close_on_end: bool,
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunEnd {
    StreamEnded,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub symbol: String,
    pub bars_processed: u64,
    pub bars_rejected: u64,
    pub entries: u64,
    pub exits: u64,
    pub stops_raised: u64,
    pub weakening: u64,
    pub realized_pnl: f64,
    pub last_exit: Option<ExitReason>,
    pub final_state: &'static str,
    pub ended_by: RunEnd,
}

impl RunSummary {
    fn new(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            bars_processed: 0,
            bars_rejected: 0,
            entries: 0,
            exits: 0,
            stops_raised: 0,
            weakening: 0,
            realized_pnl: 0.0,
            last_exit: None,
            final_state: "FLAT",
            ended_by: RunEnd::StreamEnded,
        }
    }

    fn record(&mut self, event: &TradeEvent) {
        if let Some(reason) = event.exit_reason() {
            self.last_exit = Some(reason);
        }
        match event {
            TradeEvent::Entered { .. } => self.entries += 1,
            TradeEvent::StopRaised { .. } => self.stops_raised += 1,
            TradeEvent::Weakening { .. } => self.weakening += 1,
            TradeEvent::Exited { pnl, .. } => {
                self.exits += 1;
                self.realized_pnl += pnl;
            }
        }
    }
}

/// Resolves once shutdown has been requested. Never resolves if the
/// sender is gone without having requested it.
async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

enum BarOutcome {
    Events(Vec<TradeEvent>),
    Rejected(BarError),
    Panicked(String),
}

/// Run one bar behind a panic boundary. A panic restores the trader to its
/// state before the bar.
fn step_guarded(trader: &mut MomentumTrader, bar: Bar, risk: &RiskParams) -> BarOutcome {
    let checkpoint = trader.clone();
    match panic::catch_unwind(AssertUnwindSafe(|| trader.on_bar(bar, risk))) {
        Ok(Ok(events)) => BarOutcome::Events(events),
        Ok(Err(err)) => BarOutcome::Rejected(err),
        Err(payload) => {
            *trader = checkpoint;
            BarOutcome::Panicked(panic_message(payload.as_ref()))
        }
    }
}

/// Trade one symbol until its feed ends or shutdown is requested.
pub async fn run_symbol<S>(
    symbol: &str,
    source: &dyn BarSource,
    sink: &mut S,
    config: &MomentumConfig,
    options: RunOptions,
    risk: watch::Receiver<RiskParams>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<RunSummary, RunError>
where
    S: EventSink + ?Sized,
{
    let mut stream = source.subscribe(symbol)?;
    let mut trader =
        MomentumTrader::new(symbol, config).with_risk_override(options.risk_override);
    let mut summary = RunSummary::new(symbol);
    info!(symbol, risk_override = ?options.risk_override, "run started");

    loop {
        let next = tokio::select! {
            biased;
            _ = shutdown_requested(&mut shutdown) => {
                info!(symbol, "shutdown requested");
                summary.ended_by = RunEnd::Shutdown;
                break;
            }
            next = stream.next() => next,
        };
        let Some(item) = next else {
            debug!(symbol, "bar stream ended");
            break;
        };
        let bar = match item {
            Ok(bar) => bar,
            Err(err) => {
                warn!(symbol, error = %err, "bar stream failed");
                return Err(err.into());
            }
        };

        let snapshot = risk.borrow().clone();
        match step_guarded(&mut trader, bar, &snapshot) {
            BarOutcome::Events(events) => {
                summary.bars_processed += 1;
                for event in events {
                    summary.record(&event);
                    sink.emit(event).await?;
                }
            }
            BarOutcome::Rejected(err) => {
                summary.bars_rejected += 1;
                warn!(symbol, error = %err, "bar rejected");
            }
            BarOutcome::Panicked(reason) => {
                summary.bars_rejected += 1;
                error!(symbol, %reason, "bar evaluation panicked, state restored");
            }
        }
    }

    if options.close_on_end && summary.ended_by == RunEnd::StreamEnded {
        if let Some(event) = trader.close_at_last() {
            summary.record(&event);
            sink.emit(event).await?;
        }
    }

    summary.final_state = trader.position().label();
    info!(
        symbol,
        bars = summary.bars_processed,
        rejected = summary.bars_rejected,
        entries = summary.entries,
        exits = summary.exits,
        state = summary.final_state,
        "run finished"
    );
    Ok(summary)
}

/// Trade several symbols concurrently, one task per symbol.
///
/// Results come back in symbol order. A panicking task is reported as
/// `RunError::Task` for its symbol without affecting the others.
pub async fn run_portfolio<S>(
    symbols: &[String],
    source: Arc<dyn BarSource>,
    sink: S,
    config: Arc<MomentumConfig>,
    options: RunOptions,
    risk: watch::Receiver<RiskParams>,
    shutdown: watch::Receiver<bool>,
) -> Vec<(String, Result<RunSummary, RunError>)>
where
    S: EventSink + Clone + 'static,
{
    let mut tasks = JoinSet::new();
    for (idx, symbol) in symbols.iter().enumerate() {
        let symbol = symbol.clone();
        let source = Arc::clone(&source);
        let mut sink = sink.clone();
        let config = Arc::clone(&config);
        let options = options.clone();
        let risk = risk.clone();
        let shutdown = shutdown.clone();
        tasks.spawn(async move {
            let result = run_symbol(
                &symbol,
                source.as_ref(),
                &mut sink,
                &config,
                options,
                risk,
                shutdown,
            )
            .await;
            (idx, symbol, result)
        });
    }

    let mut results: Vec<Option<(String, Result<RunSummary, RunError>)>> =
        symbols.iter().map(|_| None).collect();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, symbol, result)) => results[idx] = Some((symbol, result)),
            Err(err) => warn!(error = %err, "symbol task failed to join"),
        }
    }

    results
        .into_iter()
        .zip(symbols)
        .map(|(slot, symbol)| {
            slot.unwrap_or_else(|| {
                (
                    symbol.clone(),
                    Err(RunError::Task {
                        symbol: symbol.clone(),
                        reason: "task panicked or was cancelled".into(),
                    }),
                )
            })
        })
        .collect()
}
