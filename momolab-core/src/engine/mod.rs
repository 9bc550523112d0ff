//! Trade state machine and the async loop that drives it.

pub mod control;
pub mod events;
pub mod runner;
pub mod trader;

pub use control::RunControl;
pub use events::{ExitReason, TradeEvent};
pub use runner::{run_portfolio, run_symbol, RunEnd, RunError, RunOptions, RunSummary};
pub use trader::{MomentumTrader, TraderStatus};
