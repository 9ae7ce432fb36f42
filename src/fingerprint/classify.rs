//! Address classification
//!
//! Randomized addresses carry the locally-administered bit; everything else
//! is a candidate persistent address. A roster of stations seen by an
//! external survey seeds the pool persistent candidates are drawn from.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, trace};

use crate::error::Result;
use crate::wireless::ieee80211::MacAddr;

/// Which address set an observed source address belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    Persistent,
    Randomized,
}

/// Classify an address by its locally-administered bit alone
pub fn classify(addr: &MacAddr) -> AddressClass {
    if addr.is_locally_administered() {
        AddressClass::Randomized
    } else {
        AddressClass::Persistent
    }
}

/// Header cell that opens the station block of an airodump-ng CSV
const STATION_HEADER: &str = "Station MAC";

/// Globally administered station addresses from a survey roster
#[derive(Debug, Clone, Default)]
pub struct RosterPool {
    addrs: BTreeSet<MacAddr>,
}

impl RosterPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// Scan roster rows. When a `Station MAC` header is present only the rows
    /// after it are considered and each must have at least as many fields as
    /// the header. Rows whose first field is not a MAC address are skipped,
    /// as are locally administered addresses.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut rows = Vec::new();
        for record in rdr.byte_records() {
            match record {
                Ok(record) => rows.push(record),
                Err(e) if e.is_io_error() => return Err(e.into()),
                Err(e) => trace!("skipping unreadable roster row: {}", e),
            }
        }

        let header = rows
            .iter()
            .position(|r| first_field(r).map(|f| f == STATION_HEADER).unwrap_or(false));
        let (start, min_fields) = match header {
            Some(idx) => (idx + 1, rows[idx].len()),
            None => (0, 1),
        };

        let mut pool = Self::new();
        let mut skipped = 0usize;
        for row in &rows[start..] {
            match parse_row(row, min_fields) {
                Some(addr) if classify(&addr) == AddressClass::Persistent => {
                    pool.addrs.insert(addr);
                }
                Some(_) => {}
                None => skipped += 1,
            }
        }

        debug!(
            "roster: {} persistent addresses, {} rows skipped",
            pool.addrs.len(),
            skipped
        );
        Ok(pool)
    }

    pub fn insert(&mut self, addr: MacAddr) {
        self.addrs.insert(addr);
    }

    pub fn contains(&self, addr: &MacAddr) -> bool {
        self.addrs.contains(addr)
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MacAddr> {
        self.addrs.iter()
    }
}

impl FromIterator<MacAddr> for RosterPool {
    fn from_iter<I: IntoIterator<Item = MacAddr>>(iter: I) -> Self {
        Self {
            addrs: iter.into_iter().collect(),
        }
    }
}

fn first_field(record: &csv::ByteRecord) -> Option<&str> {
    std::str::from_utf8(record.get(0)?).ok().map(str::trim)
}

fn parse_row(record: &csv::ByteRecord, min_fields: usize) -> Option<MacAddr> {
    if record.len() < min_fields {
        return None;
    }
    first_field(record)?.parse().ok()
}
