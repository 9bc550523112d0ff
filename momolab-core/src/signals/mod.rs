//! Momentum entry / exit-flip rules.
//!
//! Signals are position-agnostic: they see bar history and indicator
//! values, never the trader's position. Both rules are recomputed from
//! scratch on every bar with no memory of earlier signals.
//!
//! Entry ("breakout off a reversal candle"): the previous bar matches an
//! entry pattern, MACD line > signal, CCI > entry threshold and, when
//! breakout confirmation is on, close > previous high.
//!
//! Exit flip ("momentum weakening"): MACD line crosses down through its
//! signal with CCI < exit threshold, or the current bar matches a bearish
//! exit pattern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::components::indicator::IndicatorValues;
use crate::domain::Bar;
use crate::indicators::{compute_indicators, IndicatorBundle, IndicatorParams, MacdComponent};
use crate::patterns::{self, PatternKind, PatternParams, PatternSet};

/// Bars of history required before either rule is evaluated.
pub const MIN_HISTORY_BARS: usize = 30;

/// Thresholds and pattern subsets for the two rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub cci_entry: f64,
    pub cci_exit: f64,
    pub confirm_break_high: bool,
    pub entry_patterns: Vec<PatternKind>,
    pub exit_patterns: Vec<PatternKind>,
    pub patterns: PatternParams,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            cci_entry: 0.0,
            cci_exit: 0.0,
            confirm_break_high: true,
            entry_patterns: vec![
                PatternKind::Doji,
                PatternKind::Hammer,
                PatternKind::InvertedHammer,
                PatternKind::BullishEngulfing,
            ],
            exit_patterns: vec![PatternKind::ShootingStar, PatternKind::BearishEngulfing],
            patterns: PatternParams::default(),
        }
    }
}

/// Rule outcomes for one bar.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarSignals {
    pub entry: bool,
    pub exit_flip: bool,
    /// Not enough history yet; both rules were suppressed.
    pub warming_up: bool,
}

/// One row of per-bar diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SignalSnapshot {
    pub bar_index: usize,
    pub timestamp: DateTime<Utc>,
    pub close: f64,
    pub patterns: String,
    pub indicators: IndicatorBundle,
    pub signals: BarSignals,
}

/// Entry and exit-flip rule evaluator.
#[derive(Debug, Clone)]
pub struct MomentumSignals {
    config: SignalConfig,
    params: IndicatorParams,
    entry_set: PatternSet,
    exit_set: PatternSet,
    line_key: String,
    signal_key: String,
    cci_key: String,
}

impl MomentumSignals {
    pub fn new(config: SignalConfig, params: IndicatorParams) -> Self {
        let entry_set = PatternSet::from_kinds(&config.entry_patterns);
        let exit_set = PatternSet::from_kinds(&config.exit_patterns);
        Self {
            line_key: params.macd_key(MacdComponent::Line),
            signal_key: params.macd_key(MacdComponent::Signal),
            cci_key: params.cci_key(),
            config,
            params,
            entry_set,
            exit_set,
        }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    pub fn indicator_params(&self) -> &IndicatorParams {
        &self.params
    }

    /// History length (in bars) needed before rules are evaluated.
    pub fn warmup_bars(&self) -> usize {
        MIN_HISTORY_BARS
    }

    /// Evaluate both rules at `bar_index`, using only `bars[..=bar_index]`.
    pub fn evaluate(
        &self,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> BarSignals {
        if bar_index >= bars.len() || bar_index + 1 < self.warmup_bars() {
            return BarSignals {
                warming_up: true,
                ..BarSignals::default()
            };
        }
        BarSignals {
            entry: self.entry_at(bars, bar_index, indicators),
            exit_flip: self.exit_flip_at(bars, bar_index, indicators),
            warming_up: false,
        }
    }

    /// Entry rule, without the warm-up guard.
    pub fn entry_at(&self, bars: &[Bar], bar_index: usize, indicators: &IndicatorValues) -> bool {
        if bar_index == 0 || bar_index >= bars.len() {
            return false;
        }
        let bar = &bars[bar_index];
        let prev = &bars[bar_index - 1];
        let prev_prev = bar_index.checked_sub(2).map(|j| &bars[j]);

        if !patterns::matches_any(self.entry_set, prev_prev, prev, &self.config.patterns) {
            return false;
        }

        let (Some(line), Some(signal), Some(cci)) = (
            indicators.defined(&self.line_key, bar_index),
            indicators.defined(&self.signal_key, bar_index),
            indicators.defined(&self.cci_key, bar_index),
        ) else {
            return false;
        };

        if !(line > signal && cci > self.config.cci_entry) {
            return false;
        }

        !self.config.confirm_break_high || bar.close > prev.high
    }

    /// Exit-flip rule, without the warm-up guard.
    pub fn exit_flip_at(
        &self,
        bars: &[Bar],
        bar_index: usize,
        indicators: &IndicatorValues,
    ) -> bool {
        if bar_index >= bars.len() {
            return false;
        }
        let bar = &bars[bar_index];
        let prev = bar_index.checked_sub(1).map(|j| &bars[j]);

        let bearish = patterns::matches_any(self.exit_set, prev, bar, &self.config.patterns);
        bearish || self.momentum_flip(bar_index, indicators)
    }

    /// MACD crossed from above to at-or-below its signal on this bar, with
    /// CCI under the exit threshold.
    fn momentum_flip(&self, bar_index: usize, indicators: &IndicatorValues) -> bool {
        if bar_index == 0 {
            return false;
        }
        let values = (
            indicators.defined(&self.line_key, bar_index),
            indicators.defined(&self.signal_key, bar_index),
            indicators.defined(&self.line_key, bar_index - 1),
            indicators.defined(&self.signal_key, bar_index - 1),
            indicators.defined(&self.cci_key, bar_index),
        );
        let (Some(line), Some(signal), Some(prev_line), Some(prev_signal), Some(cci)) = values
        else {
            return false;
        };
        let cross_down = prev_line > prev_signal && line <= signal;
        cross_down && cci < self.config.cci_exit
    }

    /// Per-bar diagnostics over a whole series.
    pub fn scan(&self, bars: &[Bar]) -> Vec<SignalSnapshot> {
        let indicators = compute_indicators(bars, &self.params);
        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                let prev = i.checked_sub(1).map(|j| &bars[j]);
                SignalSnapshot {
                    bar_index: i,
                    timestamp: bar.timestamp,
                    close: bar.close,
                    patterns: patterns::detect(prev, bar, &self.config.patterns).to_string(),
                    indicators: IndicatorBundle::at(&indicators, &self.params, i),
                    signals: self.evaluate(bars, i, &indicators),
                }
            })
            .collect()
    }
}

impl Default for MomentumSignals {
    fn default() -> Self {
        Self::new(SignalConfig::default(), IndicatorParams::default())
    }
}
