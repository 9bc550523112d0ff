//! Domain types: bars, the per-symbol bar series, and position state.

pub mod bar;
pub mod position;
pub mod series;

pub use bar::Bar;
pub use position::{OpenPosition, Position};
pub use series::{BarError, BarSeries, Upsert, DEFAULT_MAX_BARS};
