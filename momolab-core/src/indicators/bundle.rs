//! Indicator bundle: the fixed set of series the momentum rules read.
//!
//! EMA(ema_span) for the trailing stop, MACD line/signal/histogram and
//! CCI(cci_len) for the momentum confirmations.

use serde::{Deserialize, Serialize};

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

use super::{macd, Cci, Ema, Macd, MacdComponent};

/// Spans and window lengths for the bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub ema_span: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub cci_len: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            ema_span: 20,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            cci_len: 14,
        }
    }
}

impl IndicatorParams {
    pub fn ema_key(&self) -> String {
        format!("ema_{}", self.ema_span)
    }

    pub fn macd_key(&self, component: MacdComponent) -> String {
        macd::series_name(component, self.macd_fast, self.macd_slow, self.macd_signal)
    }

    pub fn cci_key(&self) -> String {
        format!("cci_{}", self.cci_len)
    }

    /// Indicator instances making up the bundle.
    pub fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        vec![
            Box::new(Ema::new(self.ema_span)),
            Box::new(Macd::line(self.macd_fast, self.macd_slow, self.macd_signal)),
            Box::new(Macd::signal(self.macd_fast, self.macd_slow, self.macd_signal)),
            Box::new(Macd::histogram(self.macd_fast, self.macd_slow, self.macd_signal)),
            Box::new(Cci::new(self.cci_len)),
        ]
    }
}

/// Compute every bundle series over `bars`. Empty in, empty series out.
pub fn compute_indicators(bars: &[Bar], params: &IndicatorParams) -> IndicatorValues {
    let mut iv = IndicatorValues::new();
    for indicator in params.indicators() {
        let series = indicator.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            indicator.name(),
            series.len(),
            bars.len()
        );
        iv.insert(indicator.name(), series);
    }
    iv
}

/// Per-bar snapshot of the bundle. `None` marks an undefined value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorBundle {
    pub ema: Option<f64>,
    pub macd_line: Option<f64>,
    pub macd_signal: Option<f64>,
    pub macd_hist: Option<f64>,
    pub cci: Option<f64>,
}

impl IndicatorBundle {
    pub fn at(values: &IndicatorValues, params: &IndicatorParams, bar_index: usize) -> Self {
        Self {
            ema: values.defined(&params.ema_key(), bar_index),
            macd_line: values.defined(&params.macd_key(MacdComponent::Line), bar_index),
            macd_signal: values.defined(&params.macd_key(MacdComponent::Signal), bar_index),
            macd_hist: values.defined(&params.macd_key(MacdComponent::Histogram), bar_index),
            cci: values.defined(&params.cci_key(), bar_index),
        }
    }
}
