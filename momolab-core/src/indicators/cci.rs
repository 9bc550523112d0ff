//! Commodity Channel Index (CCI).
//!
//! tp = (high + low + close) / 3
//! sma = rolling_mean(tp, n)
//! md  = rolling_mean(|tp - sma|, n), floored at 1e-12
//! cci = (tp - sma) / (0.015 * md)
//!
//! The deviation series is itself windowed, so the first defined value is
//! at index 2n - 2. Lookback: 2n - 2.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

use super::sma::rolling_mean;

/// Lambert's constant scaling CCI so that most values land in [-100, 100].
const CCI_SCALE: f64 = 0.015;

/// Floor for the mean deviation; a perfectly flat window would divide by zero.
pub const MEAN_DEVIATION_FLOOR: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct Cci {
    period: usize,
    name: String,
}

impl Cci {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "CCI period must be >= 1");
        Self {
            period,
            name: format!("cci_{period}"),
        }
    }
}

impl Indicator for Cci {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 2
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let tp: Vec<f64> = bars
            .iter()
            .map(|b| (b.high + b.low + b.close) / 3.0)
            .collect();
        let sma = rolling_mean(&tp, self.period);
        let deviation: Vec<f64> = tp.iter().zip(&sma).map(|(t, m)| (t - m).abs()).collect();
        let mean_dev = rolling_mean(&deviation, self.period);

        tp.iter()
            .zip(&sma)
            .zip(&mean_dev)
            .map(|((t, m), md)| {
                if m.is_nan() || md.is_nan() {
                    return f64::NAN;
                }
                (t - m) / (CCI_SCALE * md.max(MEAN_DEVIATION_FLOOR))
            })
            .collect()
    }
}
