//! Vendor lookup for assigned addresses
//!
//! Names come from a Wireshark `manuf` file. Without one every lookup is
//! empty and the report's vendor column stays blank.

use std::fs;
use std::path::Path;

use eui48::MacAddress;
use oui::OuiDatabase;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::wireless::ieee80211::MacAddr;

/// Where distributions install Wireshark's vendor table
pub const SYSTEM_MANUF_PATHS: &[&str] = &[
    "/usr/share/wireshark/manuf",
    "/usr/local/share/wireshark/manuf",
];

/// OUI to vendor short-name table
pub struct VendorDb {
    db: Option<OuiDatabase>,
}

impl VendorDb {
    /// Table that resolves nothing
    pub fn empty() -> Self {
        Self { db: None }
    }

    /// Parse the text of a `manuf` file
    pub fn from_manuf(text: &str) -> Result<Self> {
        let db = OuiDatabase::new_from_str(text).map_err(|e| Error::Vendor(e.to_string()))?;
        Ok(Self { db: Some(db) })
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path.as_ref())?;
        let db = Self::from_manuf(&text)?;
        info!("loaded vendor table {}", path.as_ref().display());
        Ok(db)
    }

    /// Load the configured table, or the first system table present. A
    /// configured path that fails to load is an error; a missing system
    /// table just leaves the vendor column empty.
    pub fn locate(configured: Option<&Path>) -> Result<Self> {
        if let Some(path) = configured {
            return Self::from_path(path);
        }

        match SYSTEM_MANUF_PATHS.iter().map(Path::new).find(|p| p.exists()) {
            Some(path) => Self::from_path(path),
            None => {
                debug!("no vendor table found, vendor column left empty");
                Ok(Self::empty())
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.db.is_some()
    }

    /// Short vendor name of the block `mac` belongs to
    pub fn lookup(&self, mac: &MacAddr) -> Option<String> {
        let db = self.db.as_ref()?;
        let addr = MacAddress::new(*mac.as_bytes());
        match db.query_by_mac(&addr) {
            Ok(Some(entry)) => Some(entry.name_short.to_string()),
            Ok(None) => None,
            Err(e) => {
                debug!(%mac, "vendor lookup failed: {}", e);
                None
            }
        }
    }
}

impl Default for VendorDb {
    fn default() -> Self {
        Self::empty()
    }
}
