//! Ratchet invariant enforcement for long stops.
//!
//! **Core Rule:** a long stop may rise, never fall.
//!
//! The trailing candidate (EMA, swing low, ...) can drop below the current
//! stop after a pullback; the ratchet keeps the high-water mark instead.

/// Ratchet over a long position's stop level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatchetState {
    level: f64,
}

impl RatchetState {
    /// Start from the position's current stop.
    pub fn new(level: f64) -> Self {
        Self { level }
    }

    /// Raise the level to `proposed` if that strictly tightens it.
    ///
    /// Returns the new level when it moved, `None` otherwise. NaN proposals
    /// never move it.
    ///
    /// # Example
    /// ```
    /// use momolab_core::position_management::RatchetState;
    ///
    /// let mut ratchet = RatchetState::new(95.0);
    ///
    /// // Tightening: $95 → $100 (allowed)
    /// assert_eq!(ratchet.raise(100.0), Some(100.0));
    ///
    /// // Loosening: $100 → $90 (blocked, stays at $100)
    /// assert_eq!(ratchet.raise(90.0), None);
    /// assert_eq!(ratchet.level(), 100.0);
    /// ```
    pub fn raise(&mut self, proposed: f64) -> Option<f64> {
        if proposed.is_nan() || proposed <= self.level {
            return None;
        }
        self.level = proposed;
        Some(proposed)
    }

    pub fn level(&self) -> f64 {
        self.level
    }
}
