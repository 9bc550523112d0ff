//! Candlestick pattern detection.
//!
//! Each predicate is evaluated independently: one candle can be a doji and
//! a hammer at the same time. `detect` collects every label that matches a
//! bar (and, for the engulfing patterns, its predecessor) into a `PatternSet`.

pub mod engulfing;
pub mod single;

pub use engulfing::{bearish_engulfing, bullish_engulfing};
pub use single::{is_doji, is_hammer, is_inverted_hammer, is_shooting_star};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::Bar;

/// Canonical reversal patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Doji,
    Hammer,
    InvertedHammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
}

impl PatternKind {
    pub const ALL: [PatternKind; 6] = [
        PatternKind::Doji,
        PatternKind::Hammer,
        PatternKind::InvertedHammer,
        PatternKind::ShootingStar,
        PatternKind::BullishEngulfing,
        PatternKind::BearishEngulfing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternKind::Doji => "doji",
            PatternKind::Hammer => "hammer",
            PatternKind::InvertedHammer => "inverted_hammer",
            PatternKind::ShootingStar => "shooting_star",
            PatternKind::BullishEngulfing => "bullish_engulfing",
            PatternKind::BearishEngulfing => "bearish_engulfing",
        }
    }

    /// Two-candle patterns need the previous bar.
    pub fn needs_previous(&self) -> bool {
        matches!(
            self,
            PatternKind::BullishEngulfing | PatternKind::BearishEngulfing
        )
    }

    fn bit(&self) -> u8 {
        1 << (*self as u8)
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PatternKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| format!("unknown pattern '{s}'"))
    }
}

/// Set of pattern labels attached to one bar. Empty means "none".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PatternSet(u8);

impl PatternSet {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_kinds(kinds: &[PatternKind]) -> Self {
        let mut set = Self::empty();
        for kind in kinds {
            set.insert(*kind);
        }
        set
    }

    pub fn insert(&mut self, kind: PatternKind) {
        self.0 |= kind.bit();
    }

    pub fn contains(&self, kind: PatternKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = PatternKind> {
        let set = *self;
        PatternKind::ALL.into_iter().filter(move |k| set.contains(*k))
    }
}

impl fmt::Display for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<&str> = self.iter().map(|k| k.as_str()).collect();
        f.write_str(&names.join("+"))
    }
}

/// Thresholds for the single-candle predicates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternParams {
    /// Doji: body <= doji_body_pct * range.
    pub doji_body_pct: f64,
    /// Hammer family: body <= body_max_pct * range.
    pub body_max_pct: f64,
    /// Hammer family: long wick >= wick_to_body_min * body.
    pub wick_to_body_min: f64,
    /// Hammer family: short wick <= opposite_wick_max_pct * range.
    pub opposite_wick_max_pct: f64,
}

impl Default for PatternParams {
    fn default() -> Self {
        Self {
            doji_body_pct: 0.20,
            body_max_pct: 0.35,
            wick_to_body_min: 2.0,
            opposite_wick_max_pct: 0.25,
        }
    }
}

/// Check a single pattern on `bar` (with `prev` for the two-candle ones).
pub fn matches(kind: PatternKind, prev: Option<&Bar>, bar: &Bar, params: &PatternParams) -> bool {
    match kind {
        PatternKind::Doji => is_doji(bar, params.doji_body_pct),
        PatternKind::Hammer => is_hammer(bar, params),
        PatternKind::InvertedHammer => is_inverted_hammer(bar, params),
        PatternKind::ShootingStar => is_shooting_star(bar, params),
        PatternKind::BullishEngulfing => prev.is_some_and(|p| {
            bullish_engulfing(p.open, p.close, bar.open, bar.close)
        }),
        PatternKind::BearishEngulfing => prev.is_some_and(|p| {
            bearish_engulfing(p.open, p.close, bar.open, bar.close)
        }),
    }
}

/// Every pattern label that `bar` satisfies.
pub fn detect(prev: Option<&Bar>, bar: &Bar, params: &PatternParams) -> PatternSet {
    let mut set = PatternSet::empty();
    for kind in PatternKind::ALL {
        if matches(kind, prev, bar, params) {
            set.insert(kind);
        }
    }
    set
}

/// True if `bar` matches at least one pattern in `subset`.
pub fn matches_any(
    subset: PatternSet,
    prev: Option<&Bar>,
    bar: &Bar,
    params: &PatternParams,
) -> bool {
    subset.iter().any(|kind| matches(kind, prev, bar, params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn candle(open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new("TEST", Utc::now(), open, high, low, close, 1000)
    }

    #[test]
    fn pattern_kind_parses_config_names() {
        assert_eq!("doji".parse::<PatternKind>(), Ok(PatternKind::Doji));
        assert_eq!(
            "bullish_engulfing".parse::<PatternKind>(),
            Ok(PatternKind::BullishEngulfing)
        );
        assert!("morning_star".parse::<PatternKind>().is_err());
    }

    #[test]
    fn pattern_kind_serde_uses_snake_case() {
        let json = serde_json::to_string(&PatternKind::InvertedHammer).unwrap();
        assert_eq!(json, "\"inverted_hammer\"");
        let back: PatternKind = serde_json::from_str("\"shooting_star\"").unwrap();
        assert_eq!(back, PatternKind::ShootingStar);
    }

    #[test]
    fn pattern_set_operations() {
        let mut set = PatternSet::empty();
        assert!(set.is_empty());
        assert_eq!(set.to_string(), "none");
        set.insert(PatternKind::Doji);
        set.insert(PatternKind::Hammer);
        assert!(set.contains(PatternKind::Doji));
        assert!(!set.contains(PatternKind::ShootingStar));
        assert_eq!(set.to_string(), "doji+hammer");
    }

    #[test]
    fn detect_collects_overlapping_labels() {
        let p = PatternParams::default();
        // dragonfly doji: doji + hammer
        let set = detect(None, &candle(20.0, 20.0, 10.0, 20.0), &p);
        assert!(set.contains(PatternKind::Doji));
        assert!(set.contains(PatternKind::Hammer));
        assert!(!set.contains(PatternKind::InvertedHammer));
    }

    #[test]
    fn detect_engulfing_needs_previous_bar() {
        let p = PatternParams::default();
        let prev = candle(10.0, 10.2, 7.8, 8.0);
        let bar = candle(7.5, 10.7, 7.4, 10.5);
        assert!(detect(Some(&prev), &bar, &p).contains(PatternKind::BullishEngulfing));
        assert!(!detect(None, &bar, &p).contains(PatternKind::BullishEngulfing));
    }

    #[test]
    fn zero_range_detects_nothing_single() {
        let p = PatternParams::default();
        let flat = candle(10.0, 10.0, 10.0, 10.0);
        let set = detect(None, &flat, &p);
        assert!(set.is_empty());
    }
}
