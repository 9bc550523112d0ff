/// Position management: trailing stop ratchet.
///
/// **Key Design Principles:**
/// 1. Stops may tighten, never loosen
/// 2. The trader proposes a trailing level each bar; the ratchet decides
///    whether it moves
pub mod ratchet;

pub use ratchet::RatchetState;
