//! Error types for decoder probing

use thiserror::Error;

use dcc_cv::ReadError;

/// Errors that can occur while probing a decoder
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    /// A probe CV could not be read
    #[error("probe read failed: {0}")]
    Read(#[from] ReadError),

    /// CV8 named a manufacturer without a supported mapping table
    #[error("no supported mapping table for manufacturer ID {id}")]
    UnknownManufacturer { id: u8 },

    /// TAMS decoder reported an unsupported CV96 mode
    #[error("unsupported TAMS mode: CV96 = {cv96}")]
    UnsupportedCapability { cv96: u8 },

    /// The configured ESU table length is not a valid table size
    #[error("unsupported ESU table length: {lines} lines")]
    UnsupportedTableSize { lines: u8 },
}
