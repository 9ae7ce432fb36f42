//! Device Group Store
//!
//! Aggregates probe frames into groups keyed by stable fingerprint.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use super::classify::{classify, AddressClass};
use super::digest::{rate_fingerprint, stable_fingerprint, STABLE_IDS};
use super::elements::ProbeFrame;
use crate::wireless::ieee80211::{MacAddr, TaggedElement};

/// Everything observed for one stable fingerprint
#[derive(Debug, Clone)]
pub struct DeviceGroup {
    /// Stable fingerprint (hex)
    pub fingerprint: String,
    /// Element sequence of the first frame seen, kept for reporting
    pub elements: Vec<TaggedElement>,
    pub rate_hashes: BTreeSet<String>,
    pub timestamps: Vec<f64>,
    pub signals: Vec<i8>,
    pub channels: Vec<u8>,
    pub ssids: BTreeSet<String>,
    pub persistent: BTreeSet<MacAddr>,
    pub randomized: BTreeSet<MacAddr>,
}

impl DeviceGroup {
    fn new(fingerprint: String, elements: Vec<TaggedElement>) -> Self {
        Self {
            fingerprint,
            elements,
            rate_hashes: BTreeSet::new(),
            timestamps: Vec::new(),
            signals: Vec::new(),
            channels: Vec::new(),
            ssids: BTreeSet::new(),
            persistent: BTreeSet::new(),
            randomized: BTreeSet::new(),
        }
    }

    fn record(&mut self, frame: &ProbeFrame, rate_hash: String) {
        self.rate_hashes.insert(rate_hash);
        self.timestamps.push(frame.timestamp);
        if let Some(signal) = frame.signal_dbm {
            self.signals.push(signal);
        }
        if let Some(channel) = frame.channel {
            self.channels.push(channel);
        }
        if let Some(ssid) = &frame.ssid {
            self.ssids.insert(ssid.clone());
        }
        self.add_address(frame.source);
    }

    fn add_address(&mut self, addr: MacAddr) {
        match classify(&addr) {
            AddressClass::Persistent => self.persistent.insert(addr),
            AddressClass::Randomized => self.randomized.insert(addr),
        };
    }

    /// Number of frames ingested into this group
    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    /// Seconds between the earliest and latest frame
    pub fn time_span(&self) -> Option<f64> {
        let min = self.timestamps.iter().copied().reduce(f64::min)?;
        let max = self.timestamps.iter().copied().reduce(f64::max)?;
        Some(max - min)
    }

    /// dB between the weakest and strongest signal sample
    pub fn signal_spread(&self) -> Option<i16> {
        let min = *self.signals.iter().min()?;
        let max = *self.signals.iter().max()?;
        Some(max as i16 - min as i16)
    }

    pub fn distinct_channels(&self) -> BTreeSet<u8> {
        self.channels.iter().copied().collect()
    }

    /// `id(bits b)` for the stable-id elements, in stored order
    pub fn capability_descriptor(&self) -> String {
        self.elements
            .iter()
            .filter(|e| STABLE_IDS.contains(&e.id))
            .map(|e| format!("{}({}b)", e.id, e.bit_len()))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Fold another group with the same fingerprint into this one. The
    /// stored element sequence is never replaced.
    fn absorb(&mut self, other: DeviceGroup) {
        self.rate_hashes.extend(other.rate_hashes);
        self.timestamps.extend(other.timestamps);
        self.signals.extend(other.signals);
        self.channels.extend(other.channels);
        self.ssids.extend(other.ssids);
        self.persistent.extend(other.persistent);
        self.randomized.extend(other.randomized);
    }
}

/// Ingest counters
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub frames: u64,
    pub groups: u64,
}

/// Map from stable fingerprint to device group. Groups are created on the
/// first frame carrying a new fingerprint and never removed.
#[derive(Debug, Default)]
pub struct DeviceGroupStore {
    groups: BTreeMap<String, DeviceGroup>,
    stats: StoreStats,
}

impl DeviceGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one frame to the group for its stable fingerprint
    pub fn ingest(&mut self, frame: ProbeFrame) {
        let stable = stable_fingerprint(&frame.elements);
        let rate = rate_fingerprint(&frame.elements);
        self.stats.frames += 1;

        let group = match self.groups.entry(stable) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.stats.groups += 1;
                trace!(fingerprint = %entry.key(), "new device group");
                let fingerprint = entry.key().clone();
                let elements = frame.elements.clone();
                entry.insert(DeviceGroup::new(fingerprint, elements))
            }
        };
        group.record(&frame, rate);
    }

    pub fn ingest_all<I: IntoIterator<Item = ProbeFrame>>(&mut self, frames: I) {
        for frame in frames {
            self.ingest(frame);
        }
        debug!(
            "ingested {} frames into {} device groups",
            self.stats.frames, self.stats.groups
        );
    }

    /// Merge a store built from a disjoint slice of the same capture.
    /// Statistics used for scoring are order-insensitive, so any merge
    /// order yields the same result.
    pub fn merge(&mut self, other: DeviceGroupStore) {
        self.stats.frames += other.stats.frames;
        for (fingerprint, group) in other.groups {
            match self.groups.entry(fingerprint) {
                Entry::Occupied(mut entry) => entry.get_mut().absorb(group),
                Entry::Vacant(entry) => {
                    self.stats.groups += 1;
                    entry.insert(group);
                }
            }
        }
    }

    pub fn get(&self, fingerprint: &str) -> Option<&DeviceGroup> {
        self.groups.get(fingerprint)
    }

    /// Groups in fingerprint order
    pub fn groups(&self) -> impl Iterator<Item = &DeviceGroup> {
        self.groups.values()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn stats(&self) -> StoreStats {
        self.stats
    }
}
