//! Probe frame extraction
//!
//! Turns a probe-request body plus its capture metadata into a
//! [`ProbeFrame`], resolving every optional field once.

use tracing::trace;

use crate::wireless::ieee80211::{parse_elements, ElementId, MacAddr, TaggedElement};

/// One probe request, reduced to what fingerprinting needs
#[derive(Debug, Clone)]
pub struct ProbeFrame {
    pub source: MacAddr,
    /// Capture timestamp in seconds
    pub timestamp: f64,
    pub signal_dbm: Option<i8>,
    pub channel: Option<u8>,
    /// Probed SSID (absent for wildcard probes or undecodable bytes)
    pub ssid: Option<String>,
    /// Tagged elements in arrival order
    pub elements: Vec<TaggedElement>,
}

/// Capture metadata that travels alongside a frame body
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta {
    pub source: MacAddr,
    pub timestamp: f64,
    pub signal_dbm: Option<i8>,
    pub channel: Option<u8>,
}

impl ProbeFrame {
    /// Build a frame from already-parsed elements. Returns `None` when there
    /// are no elements, since no fingerprint can be derived.
    pub fn from_elements(meta: FrameMeta, elements: Vec<TaggedElement>) -> Option<Self> {
        if elements.is_empty() {
            trace!(source = %meta.source, "probe request without tagged elements");
            return None;
        }

        let ssid = decode_ssid(&elements);
        Some(Self {
            source: meta.source,
            timestamp: meta.timestamp,
            signal_dbm: meta.signal_dbm,
            channel: meta.channel,
            ssid,
            elements,
        })
    }
}

/// Extract a probe frame from a raw probe-request body
pub fn extract(meta: FrameMeta, body: &[u8]) -> Option<ProbeFrame> {
    ProbeFrame::from_elements(meta, parse_elements(body))
}

/// Last non-empty SSID element; absent when its payload is not valid UTF-8
fn decode_ssid(elements: &[TaggedElement]) -> Option<String> {
    let ssid = elements
        .iter()
        .rev()
        .find(|e| e.id == ElementId::Ssid.id() && !e.payload.is_empty())?;

    std::str::from_utf8(&ssid.payload).ok().map(str::to_string)
}
