//! Pull-based bar feeds.
//!
//! A [`BarSource`] hands out one stream per symbol. The runner pulls the
//! next bar only after the previous one has been fully processed.

use futures::stream::{self, BoxStream, StreamExt};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

use crate::domain::Bar;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("no bars available for symbol {0}")]
    UnknownSymbol(String),
    #[error("bar feed for {symbol} disconnected: {reason}")]
    Disconnected { symbol: String, reason: String },
    #[error("bar feed error: {0}")]
    Feed(String),
}

pub type BarStream = BoxStream<'static, Result<Bar, StreamError>>;

/// A source of bar streams, one per symbol.
pub trait BarSource: Send + Sync {
    fn subscribe(&self, symbol: &str) -> Result<BarStream, StreamError>;
}

/// Serves preloaded bars, optionally paced by a fixed per-bar delay.
#[derive(Debug, Clone, Default)]
pub struct ReplaySource {
    bars: HashMap<String, Vec<Bar>>,
    delay: Option<Duration>,
}

impl ReplaySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = (!delay.is_zero()).then_some(delay);
        self
    }

    pub fn insert(&mut self, symbol: impl Into<String>, bars: Vec<Bar>) {
        self.bars.insert(symbol.into(), bars);
    }

    pub fn with_bars(mut self, symbol: impl Into<String>, bars: Vec<Bar>) -> Self {
        self.insert(symbol, bars);
        self
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = self.bars.keys().map(String::as_str).collect();
        out.sort_unstable();
        out
    }

    pub fn len(&self, symbol: &str) -> usize {
        self.bars.get(symbol).map_or(0, Vec::len)
    }
}

impl BarSource for ReplaySource {
    fn subscribe(&self, symbol: &str) -> Result<BarStream, StreamError> {
        let bars = self
            .bars
            .get(symbol)
            .cloned()
            .ok_or_else(|| StreamError::UnknownSymbol(symbol.to_string()))?;
        let items = stream::iter(bars.into_iter().map(Ok));
        Ok(match self.delay {
            Some(delay) => items
                .then(move |item| async move {
                    tokio::time::sleep(delay).await;
                    item
                })
                .boxed(),
            None => items.boxed(),
        })
    }
}

/// Wraps a fixed list of results; useful for injecting feed failures.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    scripts: HashMap<String, Vec<Result<Bar, StreamError>>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(
        mut self,
        symbol: impl Into<String>,
        items: Vec<Result<Bar, StreamError>>,
    ) -> Self {
        self.scripts.insert(symbol.into(), items);
        self
    }
}

impl BarSource for ScriptedSource {
    fn subscribe(&self, symbol: &str) -> Result<BarStream, StreamError> {
        let items = self
            .scripts
            .get(symbol)
            .cloned()
            .ok_or_else(|| StreamError::UnknownSymbol(symbol.to_string()))?;
        Ok(stream::iter(items).boxed())
    }
}
