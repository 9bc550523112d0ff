//! Single-candle reversal patterns.
//!
//! All proportions are of the candle's full high-low range. A zero-range
//! candle (high == low) never matches anything.

use crate::domain::Bar;

use super::PatternParams;

/// Added to the body before wick-to-body comparisons so a zero body still
/// needs a strictly positive wick.
const BODY_EPSILON: f64 = 1e-12;

/// Body sits within this fraction of the range from the high (hammer) or low (inverted).
const BODY_ZONE_PCT: f64 = 0.25;

/// Doji: body <= body_pct * range.
pub fn is_doji(bar: &Bar, body_pct: f64) -> bool {
    let range = bar.range();
    if !(range > 0.0) {
        return false;
    }
    bar.body() <= range * body_pct
}

/// Hammer: small body in the top quartile, long lower wick, short upper wick.
pub fn is_hammer(bar: &Bar, params: &PatternParams) -> bool {
    let range = bar.range();
    if !(range > 0.0) {
        return false;
    }
    let body = bar.body();
    let small_body = body <= range * params.body_max_pct;
    let long_lower = bar.lower_wick() >= params.wick_to_body_min * (body + BODY_EPSILON);
    let small_upper = bar.upper_wick() <= range * params.opposite_wick_max_pct;
    let body_near_top = bar.body_top() >= bar.high - range * BODY_ZONE_PCT;
    small_body && long_lower && small_upper && body_near_top
}

/// Inverted hammer: small body in the bottom quartile, long upper wick, short lower wick.
pub fn is_inverted_hammer(bar: &Bar, params: &PatternParams) -> bool {
    let range = bar.range();
    if !(range > 0.0) {
        return false;
    }
    let body = bar.body();
    let small_body = body <= range * params.body_max_pct;
    let long_upper = bar.upper_wick() >= params.wick_to_body_min * (body + BODY_EPSILON);
    let small_lower = bar.lower_wick() <= range * params.opposite_wick_max_pct;
    let body_near_bottom = bar.body_bottom() <= bar.low + range * BODY_ZONE_PCT;
    small_body && long_upper && small_lower && body_near_bottom
}

/// Shooting star: same shape as the inverted hammer. It reads as bearish
/// after an uptrend; trend context is up to the caller.
pub fn is_shooting_star(bar: &Bar, params: &PatternParams) -> bool {
    is_inverted_hammer(bar, params)
}
