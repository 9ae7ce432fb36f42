//! Cross-Session ESSID Overlap
//!
//! Reads Kismet network CSV exports (one per capture session) and finds the
//! ESSIDs seen in more than one session.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, trace};

use crate::error::{Error, Result};

const TIME_FORMATS: &[&str] = &[
    "%a %b %e %H:%M:%S %Y",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

fn parse_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Field text, falling back to Latin-1 when the bytes are not UTF-8
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn column(headers: &csv::ByteRecord, name: &'static str) -> Result<usize> {
    headers
        .iter()
        .position(|h| decode_field(h).trim() == name)
        .ok_or(Error::MissingColumn(name))
}

/// ESSIDs from one semicolon-delimited Kismet CSV.
///
/// Rows are dropped when either timestamp or the quality does not parse,
/// when the quality is at or below `min_quality`, or when the ESSID is blank.
pub fn extract_valid_essids<R: Read>(reader: R, min_quality: i32) -> Result<BTreeSet<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.byte_headers()?.clone();
    let first = column(&headers, "FirstTime")?;
    let last = column(&headers, "LastTime")?;
    let quality = column(&headers, "BestQuality")?;
    let essid = column(&headers, "ESSID")?;

    let mut essids = BTreeSet::new();
    let mut record = csv::ByteRecord::new();
    let mut row = 0usize;

    while rdr.read_byte_record(&mut record)? {
        row += 1;
        let field = |idx: usize| record.get(idx).map(decode_field).unwrap_or_default();

        if parse_time(&field(first)).is_none() || parse_time(&field(last)).is_none() {
            trace!(row, "dropping row with unparseable time");
            continue;
        }
        let best = match field(quality).trim().parse::<f64>() {
            Ok(q) if q.is_finite() => q,
            _ => {
                trace!(row, "dropping row with unparseable quality");
                continue;
            }
        };
        if best <= f64::from(min_quality) {
            continue;
        }

        let name = field(essid);
        if name.trim().is_empty() {
            continue;
        }
        essids.insert(name);
    }

    Ok(essids)
}

/// ESSID overlap across named sessions
#[derive(Debug, Default, Clone)]
pub struct SessionIndex {
    essid_sessions: BTreeMap<String, BTreeSet<String>>,
}

impl SessionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_session<I>(&mut self, session: &str, essids: I)
    where
        I: IntoIterator<Item = String>,
    {
        for essid in essids {
            self.essid_sessions
                .entry(essid)
                .or_default()
                .insert(session.to_string());
        }
    }

    /// Add a Kismet CSV; the session is named after the file stem.
    pub fn add_file<P: AsRef<Path>>(&mut self, path: P, min_quality: i32) -> Result<usize> {
        let path = path.as_ref();
        let session = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let essids = extract_valid_essids(File::open(path)?, min_quality)?;
        let count = essids.len();
        debug!(session = %session, essids = count, "loaded session");
        self.add_session(&session, essids);
        Ok(count)
    }

    pub fn len(&self) -> usize {
        self.essid_sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.essid_sessions.is_empty()
    }

    /// ESSIDs seen in at least `min_sessions` sessions, most widespread
    /// first and then by name.
    pub fn common(&self, min_sessions: usize) -> Vec<CommonEssid> {
        let mut common: Vec<CommonEssid> = self
            .essid_sessions
            .iter()
            .filter(|(_, sessions)| sessions.len() >= min_sessions)
            .map(|(essid, sessions)| CommonEssid {
                essid: essid.clone(),
                sessions: sessions.iter().cloned().collect(),
            })
            .collect();

        // stable sort keeps name order within equal counts
        common.sort_by(|a, b| b.sessions.len().cmp(&a.sessions.len()));
        common
    }
}

/// An ESSID and the sessions it appeared in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommonEssid {
    pub essid: String,
    pub sessions: Vec<String>,
}

impl CommonEssid {
    pub fn count(&self) -> usize {
        self.sessions.len()
    }
}

#[derive(Serialize)]
struct CommonEssidRow<'a> {
    #[serde(rename = "ESSID")]
    essid: &'a str,
    #[serde(rename = "Sessions")]
    sessions: String,
    #[serde(rename = "Count")]
    count: usize,
}

/// Write `ESSID,Sessions,Count` rows, sessions joined with ", "
pub fn write_common_csv<W: Write>(common: &[CommonEssid], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for entry in common {
        wtr.serialize(CommonEssidRow {
            essid: &entry.essid,
            sessions: entry.sessions.join(", "),
            count: entry.count(),
        })?;
    }
    wtr.flush()?;
    Ok(())
}
