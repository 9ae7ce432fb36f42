//! 802.11 Management Frame Bodies
//!
//! Tagged elements as carried in probe requests.

use super::frame::MacAddr;

/// Element identifiers the fingerprint reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ElementId {
    Ssid = 0,
    SupportedRates = 1,
    HtCapabilities = 45,
    ExtendedSupportedRates = 50,
    ExtendedCapabilities = 127,
    VendorSpecific = 221,
}

impl ElementId {
    pub const fn id(self) -> u8 {
        self as u8
    }
}

/// One tagged element: identifier plus raw payload
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaggedElement {
    pub id: u8,
    pub payload: Vec<u8>,
}

impl TaggedElement {
    pub fn new(id: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// Payload length in bits
    pub fn bit_len(&self) -> usize {
        self.payload.len() * 8
    }
}

/// Walk the tagged-element list of a management frame body. Stops at the
/// first record whose declared length runs past the end of the buffer.
pub fn parse_elements(data: &[u8]) -> Vec<TaggedElement> {
    let mut elements = Vec::new();
    let mut pos = 0;

    while pos + 2 <= data.len() {
        let id = data[pos];
        let len = data[pos + 1] as usize;
        pos += 2;

        if pos + len > data.len() {
            break;
        }

        elements.push(TaggedElement::new(id, &data[pos..pos + len]));
        pos += len;
    }

    elements
}

/// Encode elements back into tagged-element wire form
pub fn encode_elements(elements: &[TaggedElement]) -> Vec<u8> {
    let mut out = Vec::new();
    for element in elements {
        let len = element.payload.len().min(u8::MAX as usize);
        out.push(element.id);
        out.push(len as u8);
        out.extend_from_slice(&element.payload[..len]);
    }
    out
}

/// Build a complete probe-request frame (header + tagged elements)
pub fn encode_probe_request(source: MacAddr, seq: u16, elements: &[TaggedElement]) -> Vec<u8> {
    // frame control: management / probe request, no flags
    let mut frame = vec![0x40, 0x00, 0x00, 0x00];
    frame.extend_from_slice(MacAddr::BROADCAST.as_bytes());
    frame.extend_from_slice(source.as_bytes());
    frame.extend_from_slice(MacAddr::BROADCAST.as_bytes());
    frame.extend_from_slice(&(seq << 4).to_le_bytes());
    frame.extend_from_slice(&encode_elements(elements));
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wireless::ieee80211::ManagementHeader;

    #[test]
    fn test_parse_elements() {
        let body = [
            0x00, 0x04, b'h', b'o', b'm', b'e', // SSID
            0x01, 0x02, 0x82, 0x84, // rates
            0xdd, 0x00, // empty vendor element
        ];
        let elements = parse_elements(&body);

        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].id, ElementId::Ssid.id());
        assert_eq!(elements[0].payload, b"home");
        assert_eq!(elements[1].bit_len(), 16);
        assert_eq!(elements[2].id, ElementId::VendorSpecific.id());
        assert!(elements[2].payload.is_empty());
    }

    #[test]
    fn test_parse_stops_at_truncated_element() {
        let body = [0x01, 0x02, 0x82, 0x84, 0x2d, 0x1a, 0x00];
        let elements = parse_elements(&body);
        assert_eq!(elements.len(), 1);
        assert_eq!(elements[0].id, 1);

        assert!(parse_elements(&[]).is_empty());
        assert!(parse_elements(&[0x00]).is_empty());
    }

    #[test]
    fn test_encode_parse_consistent() {
        let elements = vec![
            TaggedElement::new(0, b"lab".to_vec()),
            TaggedElement::new(45, vec![0xef; 26]),
        ];
        assert_eq!(parse_elements(&encode_elements(&elements)), elements);
    }

    #[test]
    fn test_encode_probe_request() {
        let source: MacAddr = "02:00:00:00:00:01".parse().unwrap();
        let elements = vec![TaggedElement::new(1, vec![0x82])];
        let frame = encode_probe_request(source, 7, &elements);

        let header = ManagementHeader::parse(&frame).unwrap();
        assert!(header.frame_control.is_probe_request());
        assert_eq!(header.addr2, source);
        // sequence number sits above the 4-bit fragment number
        assert_eq!(u16::from_le_bytes([frame[22], frame[23]]) >> 4, 7);
        assert_eq!(parse_elements(&frame[header.body_offset..]), elements);
    }
}
