//! TOML configuration for the momentum trader.
//!
//! Every field has a default, so an empty file (or no file) yields the
//! stock strategy. Fields suffixed `_pct` hold fractions: `0.01` is 1%.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::DEFAULT_MAX_BARS;
use crate::indicators::IndicatorParams;
use crate::patterns::{PatternKind, PatternParams};
use crate::risk::{clamp_risk_fraction, RiskParams};
use crate::signals::{SignalConfig, MIN_HISTORY_BARS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskSection {
    pub equity: f64,
    pub per_trade_risk_pct: f64,
    pub max_intrabar_loss_pct: f64,
}

impl Default for RiskSection {
    fn default() -> Self {
        Self {
            equity: 10_000.0,
            per_trade_risk_pct: 0.01,
            max_intrabar_loss_pct: 0.02,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExitSection {
    /// Fixed target in multiples of initial risk. 0 disables it.
    #[serde(alias = "take_profit_R")]
    pub take_profit_r: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MomentumSection {
    pub ema_span: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub cci_len: usize,
    pub doji_body_pct: f64,
    pub cci_entry: f64,
    pub cci_exit: f64,
    pub confirm_break_high: bool,
    pub entry_patterns: Vec<PatternKind>,
    pub exit_patterns: Vec<PatternKind>,
}

impl Default for MomentumSection {
    fn default() -> Self {
        let params = IndicatorParams::default();
        let signals = SignalConfig::default();
        Self {
            ema_span: params.ema_span,
            macd_fast: params.macd_fast,
            macd_slow: params.macd_slow,
            macd_signal: params.macd_signal,
            cci_len: params.cci_len,
            doji_body_pct: signals.patterns.doji_body_pct,
            cci_entry: signals.cci_entry,
            cci_exit: signals.cci_exit,
            confirm_break_high: signals.confirm_break_high,
            entry_patterns: signals.entry_patterns,
            exit_patterns: signals.exit_patterns,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StreamSection {
    /// Per-symbol bar history cap.
    pub max_bars: usize,
}

impl Default for StreamSection {
    fn default() -> Self {
        Self {
            max_bars: DEFAULT_MAX_BARS,
        }
    }
}

/// Complete trader configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MomentumConfig {
    pub risk: RiskSection,
    pub exits: ExitSection,
    pub momentum: MomentumSection,
    pub stream: StreamSection,
}

impl MomentumConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.momentum;
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };

        if !(self.risk.equity.is_finite() && self.risk.equity > 0.0) {
            return invalid(format!("risk.equity must be > 0, got {}", self.risk.equity));
        }
        for (name, value) in [
            ("risk.per_trade_risk_pct", self.risk.per_trade_risk_pct),
            ("risk.max_intrabar_loss_pct", self.risk.max_intrabar_loss_pct),
        ] {
            if !(value.is_finite() && value > 0.0 && value < 1.0) {
                return invalid(format!("{name} must be a fraction in (0, 1), got {value}"));
            }
        }
        if !(self.exits.take_profit_r.is_finite() && self.exits.take_profit_r >= 0.0) {
            return invalid(format!(
                "exits.take_profit_r must be >= 0, got {}",
                self.exits.take_profit_r
            ));
        }
        for (name, value) in [
            ("momentum.ema_span", m.ema_span),
            ("momentum.macd_fast", m.macd_fast),
            ("momentum.macd_slow", m.macd_slow),
            ("momentum.macd_signal", m.macd_signal),
            ("momentum.cci_len", m.cci_len),
        ] {
            if value == 0 {
                return invalid(format!("{name} must be >= 1"));
            }
        }
        if m.macd_fast >= m.macd_slow {
            return invalid(format!(
                "momentum.macd_fast ({}) must be < momentum.macd_slow ({})",
                m.macd_fast, m.macd_slow
            ));
        }
        if !(m.doji_body_pct > 0.0 && m.doji_body_pct <= 1.0) {
            return invalid(format!(
                "momentum.doji_body_pct must be in (0, 1], got {}",
                m.doji_body_pct
            ));
        }
        if !m.cci_entry.is_finite() || !m.cci_exit.is_finite() {
            return invalid("momentum CCI thresholds must be finite".into());
        }
        if self.stream.max_bars < MIN_HISTORY_BARS {
            return invalid(format!(
                "stream.max_bars must be >= {MIN_HISTORY_BARS}, got {}",
                self.stream.max_bars
            ));
        }
        Ok(())
    }

    pub fn indicator_params(&self) -> IndicatorParams {
        IndicatorParams {
            ema_span: self.momentum.ema_span,
            macd_fast: self.momentum.macd_fast,
            macd_slow: self.momentum.macd_slow,
            macd_signal: self.momentum.macd_signal,
            cci_len: self.momentum.cci_len,
        }
    }

    pub fn signal_config(&self) -> SignalConfig {
        SignalConfig {
            cci_entry: self.momentum.cci_entry,
            cci_exit: self.momentum.cci_exit,
            confirm_break_high: self.momentum.confirm_break_high,
            entry_patterns: self.momentum.entry_patterns.clone(),
            exit_patterns: self.momentum.exit_patterns.clone(),
            patterns: PatternParams {
                doji_body_pct: self.momentum.doji_body_pct,
                ..PatternParams::default()
            },
        }
    }

    /// Risk parameters before any per-run override.
    pub fn risk_params(&self) -> RiskParams {
        RiskParams {
            equity: self.risk.equity,
            per_trade_risk: clamp_risk_fraction(self.risk.per_trade_risk_pct),
            max_intrabar_loss: self.risk.max_intrabar_loss_pct,
            take_profit_r: self.exits.take_profit_r,
        }
    }
}
