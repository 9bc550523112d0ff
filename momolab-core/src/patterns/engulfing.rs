//! Two-candle engulfing patterns, defined on real bodies only.

/// Bullish engulfing: red candle followed by a green candle whose body
/// contains the previous body.
pub fn bullish_engulfing(prev_open: f64, prev_close: f64, open: f64, close: f64) -> bool {
    close > open && prev_close < prev_open && open <= prev_close && close >= prev_open
}

/// Bearish engulfing: green candle followed by a red candle whose body
/// contains the previous body.
pub fn bearish_engulfing(prev_open: f64, prev_close: f64, open: f64, close: f64) -> bool {
    close < open && prev_close > prev_open && open >= prev_close && close <= prev_open
}
