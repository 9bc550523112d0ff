//! Per-symbol trade state machine.
//!
//! `MomentumTrader` owns one symbol's bar history and position. Each bar is
//! processed to completion by [`MomentumTrader::on_bar`]:
//!
//! 1. validate and upsert the bar (an invalid bar leaves the trader untouched)
//! 2. recompute the indicator bundle over the stored history
//! 3. evaluate the entry and exit-flip rules for the newest bar
//! 4. run the FLAT or LONG transition for this bar
//!
//! While LONG the checks run in a fixed priority order: fail-safe, structural
//! stop, weakening advisory, take-profit, trailing stop. The first terminal
//! outcome wins and ends processing of the bar.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::events::{ExitReason, TradeEvent};
use crate::config::MomentumConfig;
use crate::domain::{Bar, BarError, BarSeries, OpenPosition, Position, Upsert};
use crate::indicators::{compute_indicators, IndicatorBundle};
use crate::position_management::RatchetState;
use crate::risk::{clamp_risk_fraction, immediate_stop_hit, plan_entry, RiskParams};
use crate::signals::{BarSignals, MomentumSignals};

/// Point-in-time view of a trader, for status reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraderStatus {
    pub symbol: String,
    pub state: &'static str,
    pub bars_seen: u64,
    pub history_len: usize,
    pub last_bar: Option<DateTime<Utc>>,
    pub position: Position,
    /// Per-trade risk fraction the next entry would use.
    pub per_trade_risk: f64,
}

/// Momentum trader for a single symbol.
#[derive(Debug, Clone)]
pub struct MomentumTrader {
    series: BarSeries,
    signals: MomentumSignals,
    position: Position,
    risk_override: Option<f64>,
    seen_max_loss: Option<f64>,
    bars_seen: u64,
}

impl MomentumTrader {
    pub fn new(symbol: impl Into<String>, config: &MomentumConfig) -> Self {
        Self {
            series: BarSeries::with_capacity(symbol, config.stream.max_bars),
            signals: MomentumSignals::new(config.signal_config(), config.indicator_params()),
            position: Position::Flat,
            risk_override: None,
            seen_max_loss: None,
            bars_seen: 0,
        }
    }

    /// Per-trade risk fraction that takes precedence over the risk snapshot.
    pub fn with_risk_override(mut self, risk: Option<f64>) -> Self {
        self.risk_override = risk.map(clamp_risk_fraction);
        self
    }

    pub fn symbol(&self) -> &str {
        self.series.symbol()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    /// Snapshot of the trader under the given risk parameters.
    pub fn status(&self, risk: &RiskParams) -> TraderStatus {
        TraderStatus {
            symbol: self.symbol().to_string(),
            state: self.position.label(),
            bars_seen: self.bars_seen,
            history_len: self.series.len(),
            last_bar: self.series.last().map(|b| b.timestamp),
            position: self.position.clone(),
            per_trade_risk: risk.with_risk_override(self.risk_override).per_trade_risk,
        }
    }

    /// Process one bar. Returns the events it produced, in order.
    ///
    /// A bar that fails validation is reported as `Err` and leaves the
    /// series, position and stop exactly as they were.
    pub fn on_bar(&mut self, bar: Bar, risk: &RiskParams) -> Result<Vec<TradeEvent>, BarError> {
        let action = self.series.upsert(bar)?;
        self.bars_seen += 1;
        self.observe_max_loss(risk.max_intrabar_loss);

        let params = self.signals.indicator_params().clone();
        let bars = self.series.as_slice();
        let i = bars.len() - 1;
        let indicators = compute_indicators(bars, &params);
        let signals = self.signals.evaluate(bars, i, &indicators);
        let bundle = IndicatorBundle::at(&indicators, &params, i);
        let current = bars[i].clone();
        let previous = i.checked_sub(1).map(|j| bars[j].clone());

        if signals.warming_up {
            debug!(
                symbol = %self.symbol(),
                bars = i + 1,
                needed = self.signals.warmup_bars(),
                "warming up, signals suppressed"
            );
            return Ok(Vec::new());
        }
        if action == Upsert::Replaced {
            debug!(symbol = %self.symbol(), "bar revised in place");
        }

        let risk = risk.with_risk_override(self.risk_override);
        let events = if self.position.is_long() {
            self.step_long(&current, signals, bundle, &risk)
        } else if let Some(previous) = previous {
            self.step_flat(&current, &previous, signals, &risk)
        } else {
            Vec::new()
        };
        Ok(events)
    }

    /// Flatten an open position at `price`. No-op when flat.
    pub fn close_manual(&mut self, price: f64, timestamp: DateTime<Utc>) -> Option<TradeEvent> {
        let open = self.position.open()?.clone();
        Some(self.exit(&open, price, ExitReason::Manual, timestamp))
    }

    /// Close the position at the last stored close, if any.
    pub fn close_at_last(&mut self) -> Option<TradeEvent> {
        let last = self.series.last()?;
        let (price, timestamp) = (last.close, last.timestamp);
        self.close_manual(price, timestamp)
    }

    fn step_flat(
        &mut self,
        bar: &Bar,
        previous: &Bar,
        signals: BarSignals,
        risk: &RiskParams,
    ) -> Vec<TradeEvent> {
        if !signals.entry {
            return Vec::new();
        }

        let plan = match plan_entry(bar.close, previous.low, risk) {
            Ok(plan) => plan,
            Err(rejection) => {
                warn!(
                    symbol = %self.symbol(),
                    entry = bar.close,
                    pattern_stop = previous.low,
                    %rejection,
                    "entry signal rejected"
                );
                return Vec::new();
            }
        };

        let open = OpenPosition {
            entry: plan.entry,
            stop: plan.stop,
            initial_stop: plan.stop,
            target: plan.target,
            quantity: plan.quantity,
            risk_fraction: plan.risk_fraction,
            max_loss_fraction: plan.risk_fraction,
            entered_at: bar.timestamp,
        };
        self.position = Position::Long(open);

        let event = TradeEvent::Entered {
            symbol: self.symbol().to_string(),
            timestamp: bar.timestamp,
            entry: plan.entry,
            stop: plan.stop,
            qty: plan.quantity,
            risk_pct: plan.risk_fraction,
            pattern_stop: plan.pattern_stop,
            risk_stop: plan.risk_stop,
            target: plan.target,
        };
        info!(symbol = %self.symbol(), "{event}");
        vec![event]
    }

    fn step_long(
        &mut self,
        bar: &Bar,
        signals: BarSignals,
        bundle: IndicatorBundle,
        risk: &RiskParams,
    ) -> Vec<TradeEvent> {
        let Position::Long(open) = &self.position else {
            return Vec::new();
        };
        let open = open.clone();
        let price = bar.close;

        if immediate_stop_hit(price, open.entry, open.max_loss_fraction) {
            return vec![self.exit(&open, price, ExitReason::FailSafe, bar.timestamp)];
        }

        if bar.low <= open.stop {
            return vec![self.exit(&open, open.stop, ExitReason::Stop, bar.timestamp)];
        }

        let mut events = Vec::new();
        if signals.exit_flip {
            let event = TradeEvent::Weakening {
                symbol: self.symbol().to_string(),
                timestamp: bar.timestamp,
            };
            info!(symbol = %self.symbol(), "{event}");
            events.push(event);
        }

        if let Some(multiple) = risk.take_profit() {
            let target = open.entry + multiple * open.r_unit();
            if price >= target {
                events.push(self.exit(&open, target, ExitReason::TakeProfit, bar.timestamp));
                return events;
            }
        }

        let mut ratchet = RatchetState::new(open.stop);
        if let Some(new_stop) = bundle.ema.and_then(|ema| ratchet.raise(ema)) {
            if let Position::Long(p) = &mut self.position {
                p.stop = new_stop;
            }
            let event = TradeEvent::StopRaised {
                symbol: self.symbol().to_string(),
                timestamp: bar.timestamp,
                new_stop,
            };
            info!(symbol = %self.symbol(), "{event}");
            events.push(event);
        }
        events
    }

    fn exit(
        &mut self,
        open: &OpenPosition,
        exit_price: f64,
        reason: ExitReason,
        timestamp: DateTime<Utc>,
    ) -> TradeEvent {
        self.position = Position::Flat;
        let event = TradeEvent::Exited {
            symbol: self.symbol().to_string(),
            timestamp,
            exit_price,
            reason,
            pnl: open.unrealized_pnl(exit_price),
        };
        info!(symbol = %self.symbol(), "{event}");
        event
    }

    /// A change in the snapshot's intrabar-loss cutoff retunes an open
    /// position's fail-safe. Entry sets it to the trade's own risk fraction.
    fn observe_max_loss(&mut self, max_loss: f64) {
        let changed = self.seen_max_loss.is_some_and(|prev| prev != max_loss);
        self.seen_max_loss = Some(max_loss);
        if !changed {
            return;
        }
        if let Position::Long(p) = &mut self.position {
            info!(
                symbol = %self.series.symbol(),
                from = p.max_loss_fraction,
                to = max_loss,
                "fail-safe cutoff updated"
            );
            p.max_loss_fraction = max_loss;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn ts(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 14, 30, 0).unwrap() + Duration::minutes(i)
    }

    fn bar(i: i64, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new("WMT", ts(i), open, high, low, close, 1_000)
    }

    /// Steady uptrend, then a doji at `n`, then a breakout at `n + 1`.
    fn warm_uptrend(n: i64) -> Vec<Bar> {
        let mut bars: Vec<Bar> = (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.2;
                bar(i, c - 0.1, c + 0.1, c - 0.2, c)
            })
            .collect();
        let last = 100.0 + (n - 1) as f64 * 0.2;
        // Doji: tiny body, full range.
        bars.push(bar(n, last, last + 0.3, last - 0.3, last + 0.01));
        // Breakout: closes above the doji high.
        bars.push(bar(n + 1, last + 0.05, last + 0.6, last, last + 0.5));
        bars
    }

    fn feed(trader: &mut MomentumTrader, bars: &[Bar], risk: &RiskParams) -> Vec<TradeEvent> {
        let mut out = Vec::new();
        for b in bars {
            out.extend(trader.on_bar(b.clone(), risk).unwrap());
        }
        out
    }

    #[test]
    fn no_events_during_warmup() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let bars = warm_uptrend(10);
        let events = feed(&mut trader, &bars, &RiskParams::default());
        assert!(events.is_empty());
        assert!(trader.position().is_flat());
        assert_eq!(trader.status(&RiskParams::default()).bars_seen, bars.len() as u64);
    }

    #[test]
    fn enters_on_breakout_after_doji() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let bars = warm_uptrend(40);
        let events = feed(&mut trader, &bars, &RiskParams::default());

        let entered: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, TradeEvent::Entered { .. }))
            .collect();
        assert_eq!(entered.len(), 1, "events: {events:?}");
        let TradeEvent::Entered {
            entry, stop, qty, ..
        } = entered[0]
        else {
            unreachable!()
        };
        let doji = &bars[40];
        let breakout = &bars[41];
        assert_eq!(*entry, breakout.close);
        let expected_stop = doji.low.max(breakout.close * 0.99);
        assert!((stop - expected_stop).abs() < 1e-9);
        assert!(*qty > 0);
        assert!(trader.position().is_long());
    }

    #[test]
    fn malformed_bar_leaves_state_untouched() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let risk = RiskParams::default();
        feed(&mut trader, &warm_uptrend(40), &risk);
        let before = trader.status(&risk);

        let bad = bar(100, 10.0, 9.0, 11.0, 10.0);
        assert!(matches!(
            trader.on_bar(bad, &risk),
            Err(BarError::Malformed { .. })
        ));
        let stale = bar(0, 100.0, 100.1, 99.9, 100.0);
        assert!(matches!(
            trader.on_bar(stale, &risk),
            Err(BarError::OutOfOrder { .. })
        ));
        assert_eq!(trader.status(&risk), before);
    }

    #[test]
    fn fail_safe_wins_over_stop() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let risk = RiskParams::default();
        let bars = warm_uptrend(40);
        feed(&mut trader, &bars, &risk);
        let entry = trader.position().open().unwrap().entry;

        // Gap down: low below stop and close below the fail-safe cutoff.
        let crash = bar(42, entry * 0.97, entry * 0.98, entry * 0.95, entry * 0.96);
        let events = trader.on_bar(crash, &risk).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].exit_reason(), Some(ExitReason::FailSafe));
        assert!(trader.position().is_flat());
    }

    #[test]
    fn structural_stop_exits_at_stop() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let risk = RiskParams::default();
        feed(&mut trader, &warm_uptrend(40), &risk);
        let open = trader.position().open().unwrap().clone();

        // Wick through the stop, close back above the fail-safe cutoff.
        let close = open.entry * 0.999;
        let wick = bar(42, close, close + 0.05, open.stop - 0.01, close);
        let events = trader.on_bar(wick, &risk).unwrap();
        assert_eq!(events.len(), 1);
        match &events[0] {
            TradeEvent::Exited {
                exit_price, reason, ..
            } => {
                assert_eq!(*reason, ExitReason::Stop);
                assert_eq!(*exit_price, open.stop);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn take_profit_uses_initial_risk() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let risk = RiskParams {
            take_profit_r: 1.0,
            ..RiskParams::default()
        };
        feed(&mut trader, &warm_uptrend(40), &risk);
        let open = trader.position().open().unwrap().clone();
        let target = open.entry + open.r_unit();

        let pop = bar(42, open.entry, target + 0.5, open.entry, target + 0.1);
        let events = trader.on_bar(pop, &risk).unwrap();
        let exit = events.last().unwrap();
        assert_eq!(exit.exit_reason(), Some(ExitReason::TakeProfit));
        assert!(trader.position().is_flat());
    }

    #[test]
    fn trailing_stop_never_falls() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let risk = RiskParams::default();
        feed(&mut trader, &warm_uptrend(40), &risk);
        let mut last_stop = trader.position().open().unwrap().stop;

        let base = trader.series().last().unwrap().close;
        for k in 0..30 {
            let c = base + (k as f64 * 0.5).sin() * 0.2 + k as f64 * 0.05;
            let b = bar(42 + k, c, c + 0.05, c - 0.05, c);
            trader.on_bar(b, &risk).unwrap();
            match trader.position().open() {
                Some(p) => {
                    assert!(p.stop >= last_stop);
                    last_stop = p.stop;
                }
                None => break,
            }
        }
    }

    #[test]
    fn manual_close_flattens() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        feed(&mut trader, &warm_uptrend(40), &RiskParams::default());
        let ev = trader.close_at_last().unwrap();
        assert_eq!(ev.exit_reason(), Some(ExitReason::Manual));
        assert!(trader.position().is_flat());
        assert!(trader.close_at_last().is_none());
    }

    #[test]
    fn risk_override_sizes_entry() {
        let mut trader =
            MomentumTrader::new("WMT", &MomentumConfig::default()).with_risk_override(Some(0.005));
        let events = feed(&mut trader, &warm_uptrend(40), &RiskParams::default());
        let risk_pct = events.iter().find_map(|e| match e {
            TradeEvent::Entered { risk_pct, .. } => Some(*risk_pct),
            _ => None,
        });
        assert_eq!(risk_pct, Some(0.005));
        assert_eq!(trader.position().open().unwrap().max_loss_fraction, 0.005);
    }

    #[test]
    fn status_reports_effective_risk() {
        let risk = RiskParams {
            per_trade_risk: 0.02,
            ..RiskParams::default()
        };
        let plain = MomentumTrader::new("WMT", &MomentumConfig::default());
        assert_eq!(plain.status(&risk).per_trade_risk, 0.02);

        let overridden = plain.clone().with_risk_override(Some(0.005));
        let status = overridden.status(&risk);
        assert_eq!(status.per_trade_risk, 0.005);
        assert_eq!(status.state, "FLAT");
        assert_eq!(status.symbol, "WMT");
    }

    #[test]
    fn max_loss_change_retunes_open_position() {
        let mut trader = MomentumTrader::new("WMT", &MomentumConfig::default());
        let mut risk = RiskParams::default();
        feed(&mut trader, &warm_uptrend(40), &risk);
        assert!(trader.position().is_long());

        risk.max_intrabar_loss = 0.05;
        let c = trader.series().last().unwrap().close;
        trader.on_bar(bar(42, c, c + 0.05, c - 0.01, c), &risk).unwrap();
        if let Some(p) = trader.position().open() {
            assert_eq!(p.max_loss_fraction, 0.05);
        }
    }
}
