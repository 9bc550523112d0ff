//! BarSeries: the growing per-symbol bar history the trader evaluates.
//!
//! New bars are appended; a bar carrying the same timestamp as the last one
//! replaces it in place (an in-progress interval being updated). Older
//! timestamps are rejected. The series keeps at most `max_len` bars.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use thiserror::Error;

use super::Bar;

/// Default cap on retained history.
pub const DEFAULT_MAX_BARS: usize = 4000;

/// Reasons a single bar is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BarError {
    #[error("malformed bar for {symbol} at {timestamp}: {reason}")]
    Malformed {
        symbol: String,
        timestamp: DateTime<Utc>,
        reason: String,
    },

    #[error("bar for {got} delivered to the {expected} stream")]
    SymbolMismatch { expected: String, got: String },

    #[error("out-of-order bar: {got} is older than last bar {last}")]
    OutOfOrder {
        last: DateTime<Utc>,
        got: DateTime<Utc>,
    },
}

/// What `BarSeries::upsert` did with a bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Appended,
    Replaced,
}

#[derive(Debug, Clone)]
pub struct BarSeries {
    symbol: String,
    bars: VecDeque<Bar>,
    max_len: usize,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self::with_capacity(symbol, DEFAULT_MAX_BARS)
    }

    pub fn with_capacity(symbol: impl Into<String>, max_len: usize) -> Self {
        assert!(max_len >= 2, "series must retain at least two bars");
        Self {
            symbol: symbol.into(),
            bars: VecDeque::with_capacity(max_len.min(1024)),
            max_len,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Validate a bar against this series without mutating it.
    pub fn check(&self, bar: &Bar) -> Result<Upsert, BarError> {
        if bar.symbol != self.symbol {
            return Err(BarError::SymbolMismatch {
                expected: self.symbol.clone(),
                got: bar.symbol.clone(),
            });
        }
        if !bar.is_sane() {
            return Err(BarError::Malformed {
                symbol: bar.symbol.clone(),
                timestamp: bar.timestamp,
                reason: format!(
                    "o={} h={} l={} c={}",
                    bar.open, bar.high, bar.low, bar.close
                ),
            });
        }
        match self.bars.back() {
            Some(last) if bar.timestamp < last.timestamp => Err(BarError::OutOfOrder {
                last: last.timestamp,
                got: bar.timestamp,
            }),
            Some(last) if bar.timestamp == last.timestamp => Ok(Upsert::Replaced),
            _ => Ok(Upsert::Appended),
        }
    }

    /// Append or replace-in-place. On error the series is unchanged.
    pub fn upsert(&mut self, bar: Bar) -> Result<Upsert, BarError> {
        let action = self.check(&bar)?;
        match action {
            Upsert::Replaced => {
                if let Some(last) = self.bars.back_mut() {
                    *last = bar;
                }
            }
            Upsert::Appended => {
                self.bars.push_back(bar);
                while self.bars.len() > self.max_len {
                    self.bars.pop_front();
                }
            }
        }
        Ok(action)
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Contiguous view of the bars, oldest first.
    pub fn as_slice(&mut self) -> &[Bar] {
        self.bars.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}
