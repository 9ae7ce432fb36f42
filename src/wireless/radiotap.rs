//! Radiotap Header Parser
//!
//! Pulls per-frame receive metadata (signal strength, channel, flags) out of
//! the radiotap header that monitor-mode captures prepend to each frame.
//!
//! Reference: https://www.radiotap.org/

/// Radiotap present flags
pub mod flags {
    pub const TSFT: u32 = 1 << 0;
    pub const FLAGS: u32 = 1 << 1;
    pub const RATE: u32 = 1 << 2;
    pub const CHANNEL: u32 = 1 << 3;
    pub const FHSS: u32 = 1 << 4;
    pub const DBM_ANTSIGNAL: u32 = 1 << 5;
    pub const EXT: u32 = 1 << 31;
}

/// Bits of the radiotap `flags` field
pub mod frame_flags {
    /// Frame carries a trailing 4-byte FCS
    pub const FCS_AT_END: u8 = 0x10;
    pub const BAD_FCS: u8 = 0x40;
}

/// Receive metadata extracted from a radiotap header
#[derive(Debug, Clone, Default)]
pub struct RadiotapInfo {
    pub flags: Option<u8>,
    /// Channel frequency in MHz
    pub channel_freq: Option<u16>,
    /// Signal strength in dBm
    pub signal_dbm: Option<i8>,
}

impl RadiotapInfo {
    /// Channel number derived from the frequency
    pub fn channel(&self) -> Option<u8> {
        self.channel_freq.and_then(freq_to_channel)
    }

    pub fn has_fcs(&self) -> bool {
        self.flags.map(|f| f & frame_flags::FCS_AT_END != 0).unwrap_or(false)
    }

    pub fn bad_fcs(&self) -> bool {
        self.flags.map(|f| f & frame_flags::BAD_FCS != 0).unwrap_or(false)
    }
}

/// Convert frequency to channel number
pub fn freq_to_channel(freq: u16) -> Option<u8> {
    match freq {
        2484 => Some(14),
        2412..=2472 => Some(((freq - 2407) / 5) as u8),
        5160..=5885 => Some(((freq - 5000) / 5) as u8),
        // 6 GHz band (WiFi 6E)
        5955..=7115 => Some(((freq - 5950) / 5) as u8),
        _ => None,
    }
}

/// Parse a radiotap header. Returns the extracted metadata and the offset at
/// which the 802.11 frame starts.
pub fn parse_radiotap(data: &[u8]) -> Option<(RadiotapInfo, usize)> {
    if data.len() < 8 {
        return None;
    }

    // only version 0 exists
    if data[0] != 0 {
        return None;
    }

    let header_len = u16::from_le_bytes([data[2], data[3]]) as usize;
    let present_flags = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);
    if header_len < 8 || data.len() < header_len {
        return None;
    }

    // Skip any extended present words; fields start after the last one.
    let mut fields_start = 8;
    let mut word = present_flags;
    while word & flags::EXT != 0 {
        if fields_start + 4 > header_len {
            return None;
        }
        word = u32::from_le_bytes([
            data[fields_start],
            data[fields_start + 1],
            data[fields_start + 2],
            data[fields_start + 3],
        ]);
        fields_start += 4;
    }

    let mut fields = FieldReader {
        data: &data[..header_len],
        pos: fields_start,
    };
    let info = parse_fields(&mut fields, present_flags);

    Some((info, header_len))
}

/// Cursor over the header; alignment is relative to the header start.
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, size: usize, align: usize) -> Option<&'a [u8]> {
        if self.pos % align != 0 {
            self.pos += align - self.pos % align;
        }
        let bytes = self.data.get(self.pos..self.pos + size)?;
        self.pos += size;
        Some(bytes)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1, 1).map(|b| b[0])
    }

    fn u16(&mut self) -> Option<u16> {
        self.take(2, 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    fn skip(&mut self, size: usize, align: usize) {
        let _ = self.take(size, align);
    }
}

fn parse_fields(fields: &mut FieldReader<'_>, present: u32) -> RadiotapInfo {
    let mut info = RadiotapInfo::default();

    // fields are laid out in bit order; unused ones are still consumed so
    // that later fields land on the right offset
    if present & flags::TSFT != 0 {
        fields.skip(8, 8);
    }
    if present & flags::FLAGS != 0 {
        info.flags = fields.u8();
    }
    if present & flags::RATE != 0 {
        fields.skip(1, 1);
    }
    if present & flags::CHANNEL != 0 {
        info.channel_freq = fields.u16();
        fields.skip(2, 2);
    }
    if present & flags::FHSS != 0 {
        fields.skip(2, 1);
    }
    if present & flags::DBM_ANTSIGNAL != 0 {
        info.signal_dbm = fields.u8().map(|v| v as i8);
    }

    info
}

/// Build a minimal radiotap header carrying flags, channel and signal.
/// Used when writing synthetic captures.
pub fn build_radiotap(flags_field: u8, channel_freq: Option<u16>, signal_dbm: Option<i8>) -> Vec<u8> {
    let mut present = flags::FLAGS;
    let mut fields = vec![flags_field];

    if let Some(freq) = channel_freq {
        present |= flags::CHANNEL;
        // pad to 2-byte alignment (header start + 8 + 1)
        fields.push(0);
        fields.extend_from_slice(&freq.to_le_bytes());
        fields.extend_from_slice(&0u16.to_le_bytes());
    }
    if let Some(signal) = signal_dbm {
        present |= flags::DBM_ANTSIGNAL;
        fields.push(signal as u8);
    }

    let length = (8 + fields.len()) as u16;
    let mut out = vec![0x00, 0x00];
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(&present.to_le_bytes());
    out.extend_from_slice(&fields);
    out
}
