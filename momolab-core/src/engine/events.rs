//! Trade events emitted by the trader to an external notifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Close fell through the immediate-loss cutoff.
    FailSafe,
    /// Bar low touched the (possibly trailed) stop.
    Stop,
    /// Price reached the fixed R-multiple target.
    TakeProfit,
    /// Closed from outside the bar loop (end of replay, operator).
    Manual,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::FailSafe => "fail_safe",
            ExitReason::Stop => "stop",
            ExitReason::TakeProfit => "take_profit",
            ExitReason::Manual => "manual",
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A state transition or advisory from the trader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TradeEvent {
    Entered {
        symbol: String,
        timestamp: DateTime<Utc>,
        entry: f64,
        stop: f64,
        qty: u64,
        /// Fraction of equity risked (0.01 = 1%).
        risk_pct: f64,
        pattern_stop: f64,
        risk_stop: f64,
        target: Option<f64>,
    },
    StopRaised {
        symbol: String,
        timestamp: DateTime<Utc>,
        new_stop: f64,
    },
    Weakening {
        symbol: String,
        timestamp: DateTime<Utc>,
    },
    Exited {
        symbol: String,
        timestamp: DateTime<Utc>,
        exit_price: f64,
        reason: ExitReason,
        pnl: f64,
    },
}

impl TradeEvent {
    pub fn symbol(&self) -> &str {
        match self {
            TradeEvent::Entered { symbol, .. }
            | TradeEvent::StopRaised { symbol, .. }
            | TradeEvent::Weakening { symbol, .. }
            | TradeEvent::Exited { symbol, .. } => symbol,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            TradeEvent::Entered { timestamp, .. }
            | TradeEvent::StopRaised { timestamp, .. }
            | TradeEvent::Weakening { timestamp, .. }
            | TradeEvent::Exited { timestamp, .. } => *timestamp,
        }
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        match self {
            TradeEvent::Exited { reason, .. } => Some(*reason),
            _ => None,
        }
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeEvent::Entered {
                symbol,
                entry,
                stop,
                qty,
                risk_pct,
                pattern_stop,
                risk_stop,
                ..
            } => write!(
                f,
                "ENTER {symbol} @ {entry:.2} | stop {stop:.2} (pattern low {pattern_stop:.2}, risk cap {risk_stop:.2}) | qty {qty} | risk {:.2}%",
                risk_pct * 100.0
            ),
            TradeEvent::StopRaised {
                symbol, new_stop, ..
            } => write!(f, "RAISE STOP {symbol} to {new_stop:.2} (EMA trail)"),
            TradeEvent::Weakening { symbol, .. } => {
                write!(f, "WEAKENING {symbol}: momentum flip, consider exit")
            }
            TradeEvent::Exited {
                symbol,
                exit_price,
                reason,
                pnl,
                ..
            } => write!(f, "EXIT {symbol} @ {exit_price:.2} ({reason}) | pnl {pnl:.2}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization_is_tagged() {
        let ev = TradeEvent::Exited {
            symbol: "WMT".into(),
            timestamp: DateTime::parse_from_rfc3339("2025-08-29T13:05:00Z")
                .unwrap()
                .with_timezone(&Utc),
            exit_price: 98.5,
            reason: ExitReason::FailSafe,
            pnl: -75.0,
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["event"], "exited");
        assert_eq!(json["reason"], "fail_safe");
        let back: TradeEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, ev);
    }

    #[test]
    fn accessors() {
        let ts = Utc::now();
        let ev = TradeEvent::Weakening {
            symbol: "WMT".into(),
            timestamp: ts,
        };
        assert_eq!(ev.symbol(), "WMT");
        assert_eq!(ev.timestamp(), ts);
        assert_eq!(ev.exit_reason(), None);
    }

    #[test]
    fn display_is_human_readable() {
        let ev = TradeEvent::StopRaised {
            symbol: "WMT".into(),
            timestamp: Utc::now(),
            new_stop: 101.257,
        };
        assert_eq!(ev.to_string(), "RAISE STOP WMT to 101.26 (EMA trail)");
        assert_eq!(ExitReason::TakeProfit.to_string(), "take_profit");
    }
}
