//! 802.11 Frame Header
//!
//! Frame control and the three-address management header.

use std::fmt;
use std::str::FromStr;

/// MAC address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const BROADCAST: MacAddr = MacAddr([0xff, 0xff, 0xff, 0xff, 0xff, 0xff]);

    pub fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = data.get(..6)?.try_into().ok()?;
        Some(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    /// Locally administered addresses are the ones handed out by MAC
    /// randomization rather than drawn from a vendor's global block.
    pub fn is_locally_administered(&self) -> bool {
        self.0[0] & 0x02 != 0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Error returned when a string is not a colon-separated MAC address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseMacError(String);

impl fmt::Display for ParseMacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid MAC address: {:?}", self.0)
    }
}

impl std::error::Error for ParseMacError {}

impl FromStr for MacAddr {
    type Err = ParseMacError;

    /// Accepts exactly `XX:XX:XX:XX:XX:XX` (17 characters, either case).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseMacError(s.to_string());
        if s.len() != 17 {
            return Err(err());
        }

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or_else(err)?;
            if part.len() != 2 {
                return Err(err());
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| err())?;
        }
        if parts.next().is_some() {
            return Err(err());
        }

        Ok(Self(bytes))
    }
}

/// Frame type (2 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Management = 0,
    Control = 1,
    Data = 2,
    Extension = 3,
}

impl From<u8> for FrameType {
    fn from(val: u8) -> Self {
        match val & 0x03 {
            0 => FrameType::Management,
            1 => FrameType::Control,
            2 => FrameType::Data,
            _ => FrameType::Extension,
        }
    }
}

/// Management subtype of a probe request
pub const PROBE_REQUEST_SUBTYPE: u8 = 4;

/// Frame control field (2 bytes)
#[derive(Debug, Clone, Copy)]
pub struct FrameControl {
    /// Protocol version (0 for every frame in use)
    pub protocol_version: u8,
    pub frame_type: FrameType,
    pub subtype: u8,
    /// HT control field present on management frames
    pub order: bool,
}

impl FrameControl {
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&fc0, &fc1) = (data.first()?, data.get(1)?);

        Some(Self {
            protocol_version: fc0 & 0x03,
            frame_type: FrameType::from((fc0 >> 2) & 0x03),
            subtype: (fc0 >> 4) & 0x0f,
            order: fc1 & 0x80 != 0,
        })
    }

    pub fn is_probe_request(&self) -> bool {
        self.frame_type == FrameType::Management && self.subtype == PROBE_REQUEST_SUBTYPE
    }
}

/// Management frame header: fixed 24 bytes, plus 4 when the order bit
/// announces an HT control field. Only the transmitter address is kept.
#[derive(Debug, Clone)]
pub struct ManagementHeader {
    pub frame_control: FrameControl,
    /// Transmitter / source
    pub addr2: MacAddr,
    /// Offset of the frame body from the start of the frame
    pub body_offset: usize,
}

impl ManagementHeader {
    const LEN: usize = 24;
    const HT_CONTROL_LEN: usize = 4;

    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < Self::LEN {
            return None;
        }

        let frame_control = FrameControl::parse(data)?;
        if frame_control.protocol_version != 0 || frame_control.frame_type != FrameType::Management {
            return None;
        }

        let body_offset = if frame_control.order {
            Self::LEN + Self::HT_CONTROL_LEN
        } else {
            Self::LEN
        };
        if data.len() < body_offset {
            return None;
        }

        Some(Self {
            frame_control,
            addr2: MacAddr::from_slice(&data[10..])?,
            body_offset,
        })
    }
}
