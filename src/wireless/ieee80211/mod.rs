//! 802.11 Frame Parsing
//!
//! Header and tagged-element parsing for management frames.

mod frame;
mod management;

pub use frame::*;
pub use management::*;
