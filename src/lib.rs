//! probelink
//!
//! Offline analysis of 802.11 probe requests. Frames are grouped by a digest
//! of their stable capability elements, and randomized source addresses in
//! each group are linked to a persistent address when the group's timing,
//! signal, channel and SSID evidence is strong enough.

pub mod config;
pub mod error;
pub mod fingerprint;
pub mod sessions;
pub mod wireless;

pub use error::{Error, Result};
