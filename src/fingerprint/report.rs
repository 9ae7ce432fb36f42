//! Output records
//!
//! One record per device group, written as CSV, plus run totals.

use std::collections::BTreeSet;
use std::io::Write;

use serde::{Deserialize, Serialize};

use super::correlate::Assignment;
use super::store::{DeviceGroup, DeviceGroupStore};
use super::vendor::VendorDb;
use crate::error::Result;

/// Per-group output row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    #[serde(rename = "Fingerprint")]
    pub fingerprint: String,
    #[serde(rename = "Random_MACs")]
    pub random_macs: String,
    #[serde(rename = "AssignedReal")]
    pub assigned_real: String,
    /// Short vendor name of the assigned address, empty when unknown
    #[serde(rename = "Vendor")]
    pub vendor: String,
    #[serde(rename = "Score")]
    pub score: i32,
    #[serde(rename = "IE_Sequence")]
    pub ie_sequence: String,
    #[serde(rename = "Probed_SSIDs")]
    pub probed_ssids: String,
    #[serde(rename = "Frames")]
    pub frames: usize,
}

impl GroupRecord {
    pub fn build(group: &DeviceGroup, assignment: &Assignment, vendors: &VendorDb) -> Self {
        Self {
            fingerprint: group.fingerprint.clone(),
            random_macs: join(group.randomized.iter().map(|a| a.to_string())),
            assigned_real: assignment
                .persistent
                .map(|a| a.to_string())
                .unwrap_or_default(),
            vendor: assignment
                .persistent
                .and_then(|a| vendors.lookup(&a))
                .unwrap_or_default(),
            score: assignment.score,
            ie_sequence: group.capability_descriptor(),
            probed_ssids: join(group.ssids.iter().cloned()),
            frames: group.frame_count(),
        }
    }
}

fn join<I: Iterator<Item = String>>(items: I) -> String {
    items.collect::<Vec<_>>().join(";")
}

/// Pair each group with its assignment. Both sides are in fingerprint order.
pub fn build_records(
    store: &DeviceGroupStore,
    assignments: &[Assignment],
    vendors: &VendorDb,
) -> Vec<GroupRecord> {
    store
        .groups()
        .zip(assignments)
        .map(|(group, assignment)| {
            debug_assert_eq!(group.fingerprint, assignment.fingerprint);
            GroupRecord::build(group, assignment, vendors)
        })
        .collect()
}

/// Write records as CSV with a header row
pub fn write_csv<W: Write>(records: &[GroupRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Totals over a finished run
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub fingerprints: usize,
    pub randomized_addresses: usize,
    pub persistent_addresses: usize,
    pub probed_ssids: usize,
    pub probes: usize,
    pub assigned: usize,
}

impl Summary {
    /// Address counts are summed per group, matching the per-group report.
    pub fn collect(store: &DeviceGroupStore, assignments: &[Assignment]) -> Self {
        let mut ssids = BTreeSet::new();
        let mut summary = Summary {
            fingerprints: store.len(),
            ..Default::default()
        };

        for group in store.groups() {
            summary.randomized_addresses += group.randomized.len();
            summary.persistent_addresses += group.persistent.len();
            summary.probes += group.frame_count();
            ssids.extend(group.ssids.iter());
        }
        summary.probed_ssids = ssids.len();
        summary.assigned = assignments.iter().filter(|a| a.is_assigned()).count();
        summary
    }
}
