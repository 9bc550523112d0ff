//! Component traits shared across the pipeline.

pub mod indicator;

pub use indicator::{Indicator, IndicatorValues};
