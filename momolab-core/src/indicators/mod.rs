//! Concrete indicator implementations.
//!
//! EMA, MACD and CCI implement the `Indicator` trait from
//! `components::indicator`. MACD is exposed as separate named instances per
//! component, keeping the single-series trait unchanged. `bundle` wires the
//! set used by the momentum rules.

pub mod bundle;
pub mod cci;
pub mod ema;
pub mod macd;
pub mod sma;

pub use bundle::{compute_indicators, IndicatorBundle, IndicatorParams};
pub use cci::Cci;
pub use ema::{ema_of_series, Ema};
pub use macd::{macd_series, Macd, MacdComponent};
pub use sma::rolling_mean;

/// Create synthetic one-minute bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<crate::domain::Bar> {
    use crate::domain::Bar;
    use chrono::TimeZone;
    let base = chrono::Utc
        .with_ymd_and_hms(2025, 1, 2, 14, 30, 0)
        .unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar {
                symbol: "TEST".to_string(),
                timestamp: base + chrono::Duration::minutes(i as i64),
                open,
                high,
                low,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
