//! Error types for the synchronization engine

use thiserror::Error;

use dcc_cv::{InvalidAddress, InvalidCv, ReadError, WriteError};
use dcc_detect::ProbeError;

/// Errors that can occur in a programming session
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Caller-supplied decoder address out of range
    #[error(transparent)]
    InvalidAddress(#[from] InvalidAddress),

    /// Caller-supplied CV number out of range
    #[error(transparent)]
    InvalidCv(#[from] InvalidCv),

    /// A CV read failed
    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    /// A CV or page-index write failed
    #[error("write failed: {0}")]
    Write(#[from] WriteError),

    /// The manufacturer probe failed
    #[error("probe failed: {0}")]
    Probe(#[from] ProbeError),

    /// Cell coordinates outside the mapping table
    #[error("cell ({line}, {col}) outside the {lines}x{columns} matrix")]
    CellOutOfRange {
        line: u8,
        col: u8,
        lines: u8,
        columns: u8,
    },

    /// The session holds no populated matrix yet
    #[error("no mapping table has been read for this session")]
    NotPopulated,
}
