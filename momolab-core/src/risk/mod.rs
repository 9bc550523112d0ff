//! Risk parameters and position sizing.
//!
//! Sizing is risk-based: the dollar amount lost if the stop is hit equals
//! `equity * per_trade_risk`. The entry stop is the tighter of the pattern
//! stop and a stop capped at `per_trade_risk` below entry.

pub mod sizing;

pub use sizing::{
    immediate_stop_hit, plan_entry, position_size, EntryPlan, EntryRejection, MIN_RISK_PER_SHARE,
};

use serde::{Deserialize, Serialize};

/// Smallest accepted per-trade risk fraction (0.01%).
pub const MIN_RISK_FRACTION: f64 = 0.0001;

/// Largest accepted per-trade risk fraction (20%).
pub const MAX_RISK_FRACTION: f64 = 0.20;

/// Account risk settings, snapshotted once per bar by the trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    pub equity: f64,
    /// Fraction of equity risked on the stop distance.
    pub per_trade_risk: f64,
    /// Default fail-safe cutoff below entry, as a fraction.
    pub max_intrabar_loss: f64,
    /// Fixed take-profit in R multiples; 0 disables it.
    pub take_profit_r: f64,
}

impl Default for RiskParams {
    fn default() -> Self {
        Self {
            equity: 10_000.0,
            per_trade_risk: 0.01,
            max_intrabar_loss: 0.02,
            take_profit_r: 0.0,
        }
    }
}

impl RiskParams {
    /// Same parameters with the per-trade risk replaced (clamped) if an override is given.
    pub fn with_risk_override(&self, risk: Option<f64>) -> Self {
        let mut out = self.clone();
        if let Some(r) = risk {
            out.per_trade_risk = clamp_risk_fraction(r);
        }
        out
    }

    /// Take-profit multiple if one is configured.
    pub fn take_profit(&self) -> Option<f64> {
        (self.take_profit_r.is_finite() && self.take_profit_r > 0.0).then_some(self.take_profit_r)
    }
}

/// Clamp a risk fraction into `[MIN_RISK_FRACTION, MAX_RISK_FRACTION]`.
pub fn clamp_risk_fraction(value: f64) -> f64 {
    if value.is_nan() {
        return MIN_RISK_FRACTION;
    }
    value.clamp(MIN_RISK_FRACTION, MAX_RISK_FRACTION)
}

/// Parse a user-typed risk value.
///
/// A trailing `%` always means percent: `"0.5%"` is 0.005. Bare numbers of
/// 1 or more are percentages (`"1"` and `"3.2"` are 1% and 3.2%), bare
/// numbers below 1 are fractions (`"0.032"`). The result is clamped into the
/// accepted range; text that is empty or not a number yields `None`.
pub fn parse_risk_input(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let (number, percent) = match trimmed.strip_suffix('%') {
        Some(rest) => (rest.trim(), true),
        None => (trimmed, false),
    };
    if number.is_empty() {
        return None;
    }
    let value: f64 = number.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    let fraction = if percent || value >= 1.0 {
        value / 100.0
    } else {
        value
    };
    Some(clamp_risk_fraction(fraction))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_percent_forms() {
        assert!((parse_risk_input("3.2%").unwrap() - 0.032).abs() < 1e-12);
        assert!((parse_risk_input("3.2").unwrap() - 0.032).abs() < 1e-12);
        assert!((parse_risk_input("0.032").unwrap() - 0.032).abs() < 1e-12);
        assert!((parse_risk_input(" 1% ").unwrap() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn percent_sign_always_divides() {
        assert_eq!(parse_risk_input("0.5%"), Some(0.005));
        assert_eq!(parse_risk_input("2 %"), Some(0.02));
        assert!((parse_risk_input("0.02%").unwrap() - 0.0002).abs() < 1e-15);
        // bare numbers: 1 and up are percent, below 1 a fraction
        assert_eq!(parse_risk_input("1"), Some(0.01));
        assert_eq!(parse_risk_input("0.5"), Some(MAX_RISK_FRACTION));
    }

    #[test]
    fn parse_clamps_extremes() {
        assert_eq!(parse_risk_input("50"), Some(MAX_RISK_FRACTION));
        assert_eq!(parse_risk_input("0"), Some(MIN_RISK_FRACTION));
        assert_eq!(parse_risk_input("-3"), Some(MIN_RISK_FRACTION));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_risk_input(""), None);
        assert_eq!(parse_risk_input("%"), None);
        assert_eq!(parse_risk_input("5%%"), None);
        assert_eq!(parse_risk_input("abc"), None);
        assert_eq!(parse_risk_input("inf"), None);
    }

    #[test]
    fn override_replaces_only_risk() {
        let base = RiskParams::default();
        let r = base.with_risk_override(Some(0.5));
        assert_eq!(r.per_trade_risk, MAX_RISK_FRACTION);
        assert_eq!(r.equity, base.equity);
        assert_eq!(base.with_risk_override(None), base);
    }

    #[test]
    fn take_profit_disabled_by_default() {
        assert_eq!(RiskParams::default().take_profit(), None);
        let r = RiskParams {
            take_profit_r: 2.0,
            ..RiskParams::default()
        };
        assert_eq!(r.take_profit(), Some(2.0));
    }
}
