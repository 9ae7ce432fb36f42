use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::fingerprint::ScoringConfig;
use crate::wireless::CaptureConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub sessions: SessionsConfig,

    #[serde(default)]
    pub vendor: VendorConfig,
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;

        Ok(config)
    }

    /// Load config from default locations or create default
    pub fn load_or_default() -> Result<Self> {
        let paths = [
            PathBuf::from("/etc/probelink/config.toml"),
            dirs_next::config_dir()
                .map(|p| p.join("probelink/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("probelink.toml"),
        ];

        for path in &paths {
            if path.is_file() {
                return Self::load(path);
            }
        }

        Ok(Self::default())
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Cutoffs must be ordered tight before loose
    pub fn validate(&self) -> crate::error::Result<()> {
        let s = &self.scoring;
        if !(s.time_tight_secs >= 0.0 && s.time_tight_secs <= s.time_loose_secs) {
            return Err(Error::Config(format!(
                "scoring.time_tight_secs ({}) must be between 0 and time_loose_secs ({})",
                s.time_tight_secs, s.time_loose_secs
            )));
        }
        if s.signal_tight_db < 0 || s.signal_tight_db > s.signal_loose_db {
            return Err(Error::Config(format!(
                "scoring.signal_tight_db ({}) must be between 0 and signal_loose_db ({})",
                s.signal_tight_db, s.signal_loose_db
            )));
        }
        Ok(())
    }
}

/// Vendor name resolution for assigned addresses
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Wireshark `manuf` file; system locations are searched when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manuf_path: Option<PathBuf>,
}

/// Kismet session CSV filtering
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionsConfig {
    /// Rows with BestQuality at or below this are treated as noise
    #[serde(default = "default_min_quality")]
    pub min_quality: i32,

    /// Minimum number of sessions an ESSID must appear in
    #[serde(default = "default_min_sessions")]
    pub min_sessions: usize,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            min_quality: default_min_quality(),
            min_sessions: default_min_sessions(),
        }
    }
}

fn default_min_quality() -> i32 {
    -120
}

fn default_min_sessions() -> usize {
    2
}
