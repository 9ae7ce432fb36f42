//! Capture File Frame Source
//!
//! Reads probe requests out of a capture file recorded on a monitor-mode
//! interface. Classic pcap and pcapng containers are both accepted, told
//! apart by their leading magic number. Radiotap (link type 127) and bare
//! 802.11 (link type 105) interfaces are decoded.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use pcap_file::pcap::PcapReader;
use pcap_file::pcapng::blocks::interface_description::{
    InterfaceDescriptionBlock, InterfaceDescriptionOption,
};
use pcap_file::pcapng::{Block, PcapNgReader};
use pcap_file::DataLink;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::ieee80211::{FrameControl, FrameType, ManagementHeader};
use super::radiotap::{parse_radiotap, RadiotapInfo};
use crate::error::{Error, Result};
use crate::fingerprint::elements::{extract, FrameMeta, ProbeFrame};

/// Section header block type, identical in both byte orders
const PCAPNG_MAGIC: [u8; 4] = [0x0a, 0x0d, 0x0d, 0x0a];

/// Microsecond timestamps unless the interface says otherwise
const DEFAULT_TS_RESOL: u8 = 6;

/// Capture decoding options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Drop the trailing FCS when radiotap says one is present
    pub strip_fcs: bool,
    /// Skip frames radiotap marks as failing the FCS check
    pub skip_bad_fcs: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            strip_fcs: true,
            skip_bad_fcs: true,
        }
    }
}

/// Packet counters for one capture file
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStats {
    pub packets: u64,
    pub probe_requests: u64,
    /// Probe requests without any tagged element
    pub empty_probes: u64,
    /// Frames of any other type or subtype
    pub other_frames: u64,
    /// Packets whose radiotap or 802.11 header could not be parsed
    pub malformed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    Radiotap,
    Ieee80211,
}

impl LinkKind {
    fn from_datalink(datalink: DataLink) -> Option<Self> {
        match datalink {
            DataLink::IEEE802_11_RADIOTAP => Some(LinkKind::Radiotap),
            DataLink::IEEE802_11 => Some(LinkKind::Ieee80211),
            _ => None,
        }
    }
}

enum Decoded {
    Probe(ProbeFrame),
    Empty,
    Other,
    Malformed,
}

/// Interface declared by a pcapng interface description block
#[derive(Debug, Clone, Copy)]
struct Interface {
    link: Option<LinkKind>,
    ts_resol: u8,
}

impl Interface {
    fn describe(idb: &InterfaceDescriptionBlock) -> Self {
        let ts_resol = idb
            .options
            .iter()
            .find_map(|opt| match opt {
                InterfaceDescriptionOption::IfTsResol(resol) => Some(*resol),
                _ => None,
            })
            .unwrap_or(DEFAULT_TS_RESOL);

        let link = LinkKind::from_datalink(idb.linktype);
        if link.is_none() {
            warn!("ignoring packets of interface with link type {:?}", idb.linktype);
        }

        Self { link, ts_resol }
    }

    fn decode(&self, config: &CaptureConfig, data: &[u8], units: u64) -> Decoded {
        let Some(link) = self.link else {
            return Decoded::Other;
        };
        match timestamp_secs(units, self.ts_resol) {
            Some(timestamp) => decode(link, config, data, timestamp),
            None => Decoded::Malformed,
        }
    }
}

/// Convert a pcapng timestamp to seconds. The resolution is a negative
/// power of 10, or of 2 when its top bit is set.
fn timestamp_secs(units: u64, ts_resol: u8) -> Option<f64> {
    let exp = u32::from(ts_resol & 0x7f);
    let per_sec = if ts_resol & 0x80 != 0 {
        1u64.checked_shl(exp)?
    } else {
        10u64.checked_pow(exp)?
    };
    Some((units / per_sec) as f64 + (units % per_sec) as f64 / per_sec as f64)
}

enum Source<R: Read> {
    Pcap {
        reader: PcapReader<R>,
        link: LinkKind,
    },
    PcapNg {
        reader: PcapNgReader<R>,
        /// Interfaces of the current section, indexed by interface id
        interfaces: Vec<Interface>,
    },
}

/// Lazy, single-pass reader of probe frames from a capture stream
pub struct CaptureReader<R: Read> {
    source: Source<R>,
    config: CaptureConfig,
    stats: CaptureStats,
}

impl CaptureReader<BufReader<File>> {
    pub fn open<P: AsRef<Path>>(path: P, config: CaptureConfig) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        debug!("opened capture {}", path.as_ref().display());
        Self::new(BufReader::new(file), config)
    }
}

impl<R: BufRead> CaptureReader<R> {
    /// Classic pcap streams must carry a supported link type. A pcapng
    /// stream declares link types per interface, and packets of
    /// unsupported interfaces are counted as other frames.
    pub fn new(mut reader: R, config: CaptureConfig) -> Result<Self> {
        let source = if reader.fill_buf()?.starts_with(&PCAPNG_MAGIC) {
            debug!("reading pcapng stream");
            Source::PcapNg {
                reader: PcapNgReader::new(reader)?,
                interfaces: Vec::new(),
            }
        } else {
            let reader = PcapReader::new(reader)?;
            let datalink = reader.header().datalink;
            let link = LinkKind::from_datalink(datalink).ok_or(Error::UnsupportedLinkType(datalink))?;
            Source::Pcap { reader, link }
        };

        Ok(Self {
            source,
            config,
            stats: CaptureStats::default(),
        })
    }
}

impl<R: Read> CaptureReader<R> {
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Next probe frame, skipping everything that is not one. A record
    /// error ends the stream after being returned once.
    pub fn next_frame(&mut self) -> Option<Result<ProbeFrame>> {
        loop {
            let decoded = match &mut self.source {
                Source::Pcap { reader, link } => {
                    let packet = match reader.next_packet()? {
                        Ok(packet) => packet,
                        Err(e) => return Some(Err(e.into())),
                    };
                    self.stats.packets += 1;
                    decode(*link, &self.config, &packet.data, packet.timestamp.as_secs_f64())
                }
                Source::PcapNg { reader, interfaces } => {
                    let block = match reader.next_block()? {
                        Ok(block) => block,
                        Err(e) => return Some(Err(e.into())),
                    };
                    let (interface_id, units, data) = match block {
                        Block::SectionHeader(_) => {
                            interfaces.clear();
                            continue;
                        }
                        Block::InterfaceDescription(idb) => {
                            interfaces.push(Interface::describe(&idb));
                            continue;
                        }
                        Block::EnhancedPacket(epb) => {
                            (epb.interface_id as usize, epb.timestamp.as_nanos() as u64, epb.data)
                        }
                        Block::Packet(pb) => (pb.interface_id as usize, pb.timestamp, pb.data),
                        // no timestamp; always the first interface
                        Block::SimplePacket(spb) => (0, 0, spb.data),
                        _ => continue,
                    };
                    self.stats.packets += 1;
                    match interfaces.get(interface_id) {
                        Some(interface) => interface.decode(&self.config, &data, units),
                        None => Decoded::Malformed,
                    }
                }
            };

            match decoded {
                Decoded::Probe(frame) => {
                    self.stats.probe_requests += 1;
                    return Some(Ok(frame));
                }
                Decoded::Empty => {
                    self.stats.probe_requests += 1;
                    self.stats.empty_probes += 1;
                }
                Decoded::Other => self.stats.other_frames += 1,
                Decoded::Malformed => {
                    trace!(packet = self.stats.packets, "skipping malformed packet");
                    self.stats.malformed += 1;
                }
            }
        }
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<ProbeFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

fn decode(link: LinkKind, config: &CaptureConfig, data: &[u8], timestamp: f64) -> Decoded {
    let (info, mut frame) = match link {
        LinkKind::Radiotap => match parse_radiotap(data) {
            Some((info, offset)) => (info, &data[offset..]),
            None => return Decoded::Malformed,
        },
        LinkKind::Ieee80211 => (RadiotapInfo::default(), data),
    };

    if config.skip_bad_fcs && info.bad_fcs() {
        return Decoded::Malformed;
    }
    if config.strip_fcs && info.has_fcs() {
        match frame.len().checked_sub(4) {
            Some(len) => frame = &frame[..len],
            None => return Decoded::Malformed,
        }
    }

    match FrameControl::parse(frame) {
        Some(fc) if fc.is_probe_request() => {}
        Some(fc) if fc.frame_type != FrameType::Management || frame.len() >= 24 => {
            return Decoded::Other
        }
        _ => return Decoded::Malformed,
    }

    let header = match ManagementHeader::parse(frame) {
        Some(header) => header,
        None => return Decoded::Malformed,
    };

    let meta = FrameMeta {
        source: header.addr2,
        timestamp,
        signal_dbm: info.signal_dbm,
        channel: info.channel(),
    };
    match extract(meta, &frame[header.body_offset..]) {
        Some(probe) => Decoded::Probe(probe),
        None => Decoded::Empty,
    }
}
