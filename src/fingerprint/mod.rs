//! Probe-request fingerprinting and address correlation
//!
//! Frames are grouped by a digest of their capability elements. Within each
//! group, randomized (locally administered) source addresses are linked to a
//! persistent address when group-wide signals agree strongly enough.
//!
//! ```text
//! ProbeFrame ─► stable / rate digest ─► DeviceGroupStore ─► Correlator ─► GroupRecord
//! ```

pub mod classify;
pub mod correlate;
pub mod digest;
pub mod elements;
pub mod report;
pub mod store;
pub mod vendor;

pub use classify::{classify, AddressClass, RosterPool};
pub use correlate::{Assignment, Correlator, ScoreBreakdown, ScoringConfig};
pub use digest::{compute_digest, rate_fingerprint, stable_fingerprint, RATE_IDS, STABLE_IDS};
pub use elements::{extract, FrameMeta, ProbeFrame};
pub use report::{build_records, write_csv, GroupRecord, Summary};
pub use store::{DeviceGroup, DeviceGroupStore, StoreStats};
pub use vendor::VendorDb;

/// Result of one offline analysis run
#[derive(Debug)]
pub struct Analysis {
    pub store: DeviceGroupStore,
    pub assignments: Vec<Assignment>,
}

impl Analysis {
    /// Ingest every frame, then correlate the finished store.
    pub fn run<I>(frames: I, correlator: &Correlator) -> Self
    where
        I: IntoIterator<Item = ProbeFrame>,
    {
        let mut store = DeviceGroupStore::new();
        store.ingest_all(frames);
        let assignments = correlator.assign_all(&store);
        Self { store, assignments }
    }

    pub fn records(&self, vendors: &VendorDb) -> Vec<GroupRecord> {
        build_records(&self.store, &self.assignments, vendors)
    }

    pub fn summary(&self) -> Summary {
        Summary::collect(&self.store, &self.assignments)
    }
}
