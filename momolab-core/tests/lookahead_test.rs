//! Look-ahead contamination tests for the indicators and signal rules.
//!
//! Invariant: no value at bar t may depend on bar t+1 or later.
//!
//! Method: compute on a truncated series (bars 0..150) and the full series
//! (bars 0..300). Values for bars 0..150 must be identical in both runs.

use chrono::{Duration, TimeZone, Utc};
use momolab_core::components::indicator::Indicator;
use momolab_core::domain::Bar;
use momolab_core::indicators::*;
use momolab_core::signals::MomentumSignals;

/// Deterministic pseudo-random walk of one-minute bars.
fn make_test_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2025, 3, 3, 14, 30, 0).unwrap();
    let mut bars = Vec::with_capacity(n);
    let mut price = 100.0;

    for i in 0..n {
        let seed = (i as u64).wrapping_mul(6364136223846793005).wrapping_add(1);
        let change = ((seed % 200) as f64 - 100.0) * 0.01;
        price += change;
        price = price.max(10.0);

        let open = price - 0.1;
        let close = price + 0.05;
        let high = open.max(close) + 0.2 + (seed % 7) as f64 * 0.03;
        let low = open.min(close) - 0.2 - (seed % 5) as f64 * 0.03;

        bars.push(Bar::new(
            "TEST",
            base + Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            1_000 + i as u64,
        ));
    }
    bars
}

fn assert_no_lookahead(indicator: &dyn Indicator, full_bars: &[Bar], truncated_len: usize) {
    let truncated = &full_bars[..truncated_len];
    let full_result = indicator.compute(full_bars);
    let truncated_result = indicator.compute(truncated);

    assert_eq!(truncated_result.len(), truncated_len, "{}", indicator.name());
    assert_eq!(full_result.len(), full_bars.len(), "{}", indicator.name());

    for i in 0..truncated_len {
        let t = truncated_result[i];
        let f = full_result[i];
        if t.is_nan() && f.is_nan() {
            continue;
        }
        assert!(
            !t.is_nan() && !f.is_nan(),
            "{}: NaN mismatch at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
        assert!(
            (t - f).abs() < 1e-12,
            "{}: look-ahead at bar {i} (truncated={t}, full={f})",
            indicator.name()
        );
    }
}

#[test]
fn ema_no_lookahead() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Ema::new(20), &bars, 150);
}

#[test]
fn macd_components_no_lookahead() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Macd::line(12, 26, 9), &bars, 150);
    assert_no_lookahead(&Macd::signal(12, 26, 9), &bars, 150);
    assert_no_lookahead(&Macd::histogram(12, 26, 9), &bars, 150);
}

#[test]
fn cci_no_lookahead() {
    let bars = make_test_bars(300);
    assert_no_lookahead(&Cci::new(14), &bars, 150);
    assert_no_lookahead(&Cci::new(20), &bars, 150);
}

#[test]
fn signals_no_lookahead() {
    let bars = make_test_bars(300);
    let signals = MomentumSignals::default();
    let full = signals.scan(&bars);
    let truncated = signals.scan(&bars[..150]);
    assert_eq!(truncated.len(), 150);
    for (t, f) in truncated.iter().zip(&full) {
        assert_eq!(t.signals, f.signals, "signal look-ahead at bar {}", t.bar_index);
        assert_eq!(t.patterns, f.patterns);
    }
}
