//! Control handle for running traders: live risk updates and shutdown.
//!
//! Runners hold the receiving ends; whoever owns the `RunControl` (a CLI,
//! a chat bot, a test) holds the senders. Updates land between bars.

use tokio::sync::watch;
use tracing::info;

use crate::risk::{parse_risk_input, RiskParams};

#[derive(Debug)]
pub struct RunControl {
    risk: watch::Sender<RiskParams>,
    shutdown: watch::Sender<bool>,
}

impl RunControl {
    pub fn new(initial: RiskParams) -> Self {
        let (risk, _) = watch::channel(initial);
        let (shutdown, _) = watch::channel(false);
        Self { risk, shutdown }
    }

    pub fn risk(&self) -> RiskParams {
        self.risk.borrow().clone()
    }

    pub fn risk_receiver(&self) -> watch::Receiver<RiskParams> {
        self.risk.subscribe()
    }

    pub fn shutdown_receiver(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Set per-trade risk from operator text (`"1.5%"`, `"1.5"`, `"0.015"`).
    /// Returns the fraction applied, or `None` if the text was unusable.
    pub fn set_per_trade_risk(&self, text: &str) -> Option<f64> {
        let fraction = parse_risk_input(text)?;
        self.risk.send_modify(|r| r.per_trade_risk = fraction);
        info!(fraction, "per-trade risk updated");
        Some(fraction)
    }

    /// Set the fail-safe cutoff from operator text, same forms as risk.
    pub fn set_max_intrabar_loss(&self, text: &str) -> Option<f64> {
        let fraction = parse_risk_input(text)?;
        self.risk.send_modify(|r| r.max_intrabar_loss = fraction);
        info!(fraction, "max intrabar loss updated");
        Some(fraction)
    }

    /// Set the take-profit multiple. Zero or negative disables it.
    pub fn set_take_profit_r(&self, multiple: f64) {
        let multiple = if multiple.is_finite() { multiple.max(0.0) } else { 0.0 };
        self.risk.send_modify(|r| r.take_profit_r = multiple);
        info!(multiple, "take-profit multiple updated");
    }

    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
        info!("shutdown requested");
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}
