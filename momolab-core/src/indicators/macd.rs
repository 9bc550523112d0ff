//! MACD: moving average convergence/divergence.
//!
//! Three series (separate Indicator instances):
//! - Line: EMA(close, fast) - EMA(close, slow)
//! - Signal: EMA(line, signal)
//! - Histogram: line - signal
//!
//! All EMAs seed on the first value, so every series is defined from bar 0.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

use super::ema::ema_of_series;

/// Which MACD series to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacdComponent {
    Line,
    Signal,
    Histogram,
}

impl MacdComponent {
    fn prefix(&self) -> &'static str {
        match self {
            MacdComponent::Line => "macd_line",
            MacdComponent::Signal => "macd_signal",
            MacdComponent::Histogram => "macd_hist",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Macd {
    fast: usize,
    slow: usize,
    signal: usize,
    component: MacdComponent,
    name: String,
}

impl Macd {
    pub fn new(fast: usize, slow: usize, signal: usize, component: MacdComponent) -> Self {
        assert!(fast >= 1, "MACD fast span must be >= 1");
        assert!(slow > fast, "MACD slow span must be > fast span");
        assert!(signal >= 1, "MACD signal span must be >= 1");
        Self {
            fast,
            slow,
            signal,
            component,
            name: series_name(component, fast, slow, signal),
        }
    }

    pub fn line(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Line)
    }

    pub fn signal(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Signal)
    }

    pub fn histogram(fast: usize, slow: usize, signal: usize) -> Self {
        Self::new(fast, slow, signal, MacdComponent::Histogram)
    }
}

/// Series key for one MACD component, e.g. `macd_line_12_26_9`.
pub fn series_name(component: MacdComponent, fast: usize, slow: usize, signal: usize) -> String {
    format!("{}_{fast}_{slow}_{signal}", component.prefix())
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let (line, signal, hist) = macd_series(&closes, self.fast, self.slow, self.signal);
        match self.component {
            MacdComponent::Line => line,
            MacdComponent::Signal => signal,
            MacdComponent::Histogram => hist,
        }
    }
}

/// Compute (line, signal, histogram) in one pass over the closes.
pub fn macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let ema_fast = ema_of_series(closes, fast);
    let ema_slow = ema_of_series(closes, slow);
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let sig = ema_of_series(&line, signal);
    let hist: Vec<f64> = line.iter().zip(&sig).map(|(l, s)| l - s).collect();
    (line, sig, hist)
}
