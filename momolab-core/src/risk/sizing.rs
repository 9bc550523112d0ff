//! Risk-based sizing, entry stop selection and the fail-safe check.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::RiskParams;

/// Floor on risk per share so a zero-width stop cannot divide by zero.
pub const MIN_RISK_PER_SHARE: f64 = 0.01;

/// Slack on the fail-safe comparison so exact-threshold prices still trigger.
const FAIL_SAFE_EPSILON: f64 = 1e-12;

/// Whole shares such that hitting `stop` loses `equity * risk_fraction`.
///
/// Risk per share is floored at `MIN_RISK_PER_SHARE`: a stop at (or above)
/// entry therefore still sizes a large position. Callers reject entries with
/// `entry <= stop` before acting on the result.
pub fn position_size(entry: f64, stop: f64, equity: f64, risk_fraction: f64) -> u64 {
    let risk_per_share = (entry - stop).max(MIN_RISK_PER_SHARE);
    let risk_dollars = (equity * risk_fraction).max(0.0);
    if !(risk_per_share > 0.0) {
        return 0;
    }
    (risk_dollars / risk_per_share).floor() as u64
}

/// Fail-safe: price has fallen `max_loss_fraction` or more below entry.
pub fn immediate_stop_hit(price: f64, entry: f64, max_loss_fraction: f64) -> bool {
    price <= entry * (1.0 - max_loss_fraction + FAIL_SAFE_EPSILON)
}

/// Why an entry signal was not turned into a position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryRejection {
    /// Pattern stop (and therefore the chosen stop) is NaN or infinite.
    NonFiniteStop,
    /// Chosen stop is at or above the entry price.
    StopAboveEntry,
    /// Risk budget buys zero shares.
    ZeroQuantity,
}

impl fmt::Display for EntryRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            EntryRejection::NonFiniteStop => "stop is not a finite price",
            EntryRejection::StopAboveEntry => "stop is at or above entry",
            EntryRejection::ZeroQuantity => "risk budget buys zero shares",
        };
        f.write_str(msg)
    }
}

/// Accepted entry: levels and size for a new long position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPlan {
    pub entry: f64,
    /// Low of the candle before the entry bar.
    pub pattern_stop: f64,
    /// `entry * (1 - per_trade_risk)`.
    pub risk_stop: f64,
    /// Higher of the two.
    pub stop: f64,
    pub quantity: u64,
    pub risk_fraction: f64,
    pub target: Option<f64>,
}

/// Choose the stop, size the trade and apply the reject rules.
pub fn plan_entry(
    entry: f64,
    pattern_stop: f64,
    risk: &RiskParams,
) -> Result<EntryPlan, EntryRejection> {
    if !pattern_stop.is_finite() || !entry.is_finite() {
        return Err(EntryRejection::NonFiniteStop);
    }
    let risk_fraction = risk.per_trade_risk;
    let risk_stop = entry * (1.0 - risk_fraction);
    let stop = pattern_stop.max(risk_stop);
    if !stop.is_finite() {
        return Err(EntryRejection::NonFiniteStop);
    }

    let quantity = position_size(entry, stop, risk.equity, risk_fraction);
    if quantity == 0 {
        return Err(EntryRejection::ZeroQuantity);
    }
    if entry <= stop {
        return Err(EntryRejection::StopAboveEntry);
    }

    let target = risk.take_profit().map(|r| entry + r * (entry - stop));

    Ok(EntryPlan {
        entry,
        pattern_stop,
        risk_stop,
        stop,
        quantity,
        risk_fraction,
        target,
    })
}
