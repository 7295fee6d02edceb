//! Error types for CV access

use thiserror::Error;

/// Decoder address outside the DCC multifunction range
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("decoder address {0} outside 1..=9999")]
pub struct InvalidAddress(pub u16);

/// CV number outside the addressable range
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("CV number {cv} outside 1..={limit}")]
pub struct InvalidCv {
    /// The rejected CV number
    pub cv: u16,
    /// Upper bound of the range the caller asked for (255 direct, 1024 total)
    pub limit: u16,
}

/// Errors that can occur while reading a CV
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReadError {
    /// Retry budget consumed without a single decodable reply
    ///
    /// Surfaced identically whether the attempts timed out or came back
    /// garbled; the transport reports both as a failed attempt.
    #[error("no usable reply after {attempts} read attempts")]
    Exhausted { attempts: u32 },

    /// XPOM block size outside the 1..=4 quad range
    #[error("XPOM block of {quads} quads outside 1..=4")]
    InvalidBlockLength { quads: u8 },
}

/// Errors that can occur while writing a CV
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// Retry budget consumed without an acknowledged transmission
    #[error("no acknowledged transmission after {attempts} write attempts")]
    Exhausted { attempts: u32 },

    /// Post-write read-back missing or different from the intended value
    #[error("read-back of CV{cv} returned {read_back:?}, expected {expected}")]
    VerificationFailed {
        cv: u16,
        expected: u8,
        read_back: Option<u8>,
    },

    /// CV31/CV32 index write failed, blocking all subsequent paged access
    #[error("programming page write failed at CV{cv}")]
    PageWriteFailed {
        cv: u16,
        #[source]
        source: Box<WriteError>,
    },
}
