use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An open long position and the stop/target levels guarding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub entry: f64,
    /// Current protective stop. Only ever rises while the position is open.
    pub stop: f64,
    /// Stop at entry time; defines one R.
    pub initial_stop: f64,
    pub target: Option<f64>,
    pub quantity: u64,
    /// Fraction of equity risked on this trade.
    pub risk_fraction: f64,
    /// Fail-safe cutoff below entry, as a fraction.
    pub max_loss_fraction: f64,
    pub entered_at: DateTime<Utc>,
}

impl OpenPosition {
    /// Distance between entry and the initial stop.
    pub fn r_unit(&self) -> f64 {
        self.entry - self.initial_stop
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.quantity as f64 * (price - self.entry)
    }
}

/// Trade state for one symbol: flat, or long with an open position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Position {
    #[default]
    Flat,
    Long(OpenPosition),
}

impl Position {
    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Position::Long(_))
    }

    pub fn open(&self) -> Option<&OpenPosition> {
        match self {
            Position::Long(p) => Some(p),
            Position::Flat => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Position::Flat => "FLAT",
            Position::Long(_) => "LONG",
        }
    }
}
