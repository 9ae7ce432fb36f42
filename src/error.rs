//! Library error type

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pcap error: {0}")]
    Pcap(#[from] pcap_file::PcapError),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("unsupported capture link type: {0:?}")]
    UnsupportedLinkType(pcap_file::DataLink),

    #[error("missing column: {0}")]
    MissingColumn(&'static str),

    #[error("vendor table error: {0}")]
    Vendor(String),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
