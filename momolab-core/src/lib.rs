//! Momolab Core: intraday momentum decisions over a live bar stream.
//!
//! This crate contains:
//! - Domain types (bars, the bounded per-symbol bar series, positions)
//! - Indicators (EMA, MACD, CCI) behind the `Indicator` trait
//! - Candlestick pattern detection
//! - Entry and exit-flip signal rules
//! - Risk sizing and stop selection
//! - The per-symbol trade state machine with a ratcheting trailing stop
//! - An async runtime that feeds bars from a source and emits trade events

pub mod components;
pub mod config;
pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod patterns;
pub mod position_management;
pub mod risk;
pub mod signals;

pub use config::{ConfigError, MomentumConfig};
pub use domain::{Bar, BarError, BarSeries, Position};
pub use engine::{ExitReason, MomentumTrader, TradeEvent};
pub use risk::RiskParams;
