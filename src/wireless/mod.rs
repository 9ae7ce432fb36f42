//! 802.11 Capture Decoding
//!
//! Decodes monitor-mode captures down to probe requests:
//! - Radiotap headers (signal, channel, FCS flags)
//! - 802.11 management headers and tagged elements
//! - pcap and pcapng file reading
//!
//! Live capture is out of scope; frames come from recorded capture files.

pub mod capture;
pub mod ieee80211;
pub mod radiotap;

pub use capture::{CaptureConfig, CaptureReader, CaptureStats};
pub use ieee80211::{
    encode_probe_request, parse_elements, ElementId, FrameControl, FrameType, MacAddr,
    ManagementHeader, TaggedElement,
};
pub use radiotap::RadiotapInfo;
