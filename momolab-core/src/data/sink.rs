//! Event sinks: where trade events go once a bar has been processed.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::info;

use crate::engine::TradeEvent;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("event receiver dropped")]
    Closed,
}

/// Receives trade events in emission order.
#[async_trait]
pub trait EventSink: Send {
    async fn emit(&mut self, event: TradeEvent) -> Result<(), SinkError>;
}

/// Forwards events into a tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<TradeEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<TradeEvent>) -> Self {
        Self { tx }
    }

    /// A sink plus the receiving end of a fresh channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<TradeEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn emit(&mut self, event: TradeEvent) -> Result<(), SinkError> {
        self.tx.send(event).await.map_err(|_| SinkError::Closed)
    }
}

/// Writes each event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl EventSink for LogSink {
    async fn emit(&mut self, event: TradeEvent) -> Result<(), SinkError> {
        info!(
            target: "momolab::events",
            symbol = %event.symbol(),
            at = %event.timestamp(),
            "{event}"
        );
        Ok(())
    }
}

/// Collects events in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<TradeEvent>>>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TradeEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for VecSink {
    async fn emit(&mut self, event: TradeEvent) -> Result<(), SinkError> {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
        Ok(())
    }
}
