//! Core domain types for CV access

use crate::error::{InvalidAddress, InvalidCv};

/// Highest multifunction decoder address on the DCC bus
pub const MAX_DECODER_ADDRESS: u16 = 9999;

/// Highest CV reachable without paging
pub const MAX_DIRECT_CV: u16 = 255;

/// Highest CV in the 10-bit DCC CV space
pub const MAX_CV: u16 = 1024;

/// First CV of the paged window selected by CV31/CV32
pub const PAGED_CV_BASE: u16 = 257;

/// Address of a decoder on the DCC bus
///
/// While a multi-step sequence (paging + access) is in flight against an
/// address, no other operation may interleave with it; callers hold the
/// session exclusively for the duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecoderAddress(pub(crate) u16);

impl DecoderAddress {
    /// Validate a raw bus address (1..=9999)
    pub fn new(raw: u16) -> Result<Self, InvalidAddress> {
        if raw == 0 || raw > MAX_DECODER_ADDRESS {
            return Err(InvalidAddress(raw));
        }
        Ok(Self(raw))
    }

    /// Get the raw address value
    pub fn get(&self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for DecoderAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Number of an 8-bit Configuration Variable
///
/// CVs 1..=255 are directly addressable. CVs above that live in the paged
/// window 257..=512 and are only meaningful after the programming page
/// (CV31/CV32) has been set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CvNumber(pub(crate) u16);

impl CvNumber {
    /// Manufacturer ID
    pub const CV8: CvNumber = CvNumber(8);
    /// Programming page, high selector
    pub const CV31: CvNumber = CvNumber(31);
    /// Programming page, low selector
    pub const CV32: CvNumber = CvNumber(32);
    /// TAMS capability/mode CV
    pub const CV96: CvNumber = CvNumber(96);

    /// Validate a raw CV number anywhere in the 10-bit space (1..=1024)
    pub fn new(raw: u16) -> Result<Self, InvalidCv> {
        if raw == 0 || raw > MAX_CV {
            return Err(InvalidCv { cv: raw, limit: MAX_CV });
        }
        Ok(Self(raw))
    }

    /// Validate a raw CV number in the directly addressable range (1..=255)
    pub fn direct(raw: u16) -> Result<Self, InvalidCv> {
        if raw == 0 || raw > MAX_DIRECT_CV {
            return Err(InvalidCv { cv: raw, limit: MAX_DIRECT_CV });
        }
        Ok(Self(raw))
    }

    /// CV at `offset` within the currently selected programming page
    pub fn paged(offset: u8) -> Self {
        Self(PAGED_CV_BASE + offset as u16)
    }

    /// Get the raw CV number
    pub fn get(&self) -> u16 {
        self.0
    }

    /// Whether this CV needs the programming page to be set first
    pub fn is_paged(&self) -> bool {
        self.0 > MAX_DIRECT_CV
    }
}

impl std::fmt::Display for CvNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CV{}", self.0)
    }
}

/// A CV31/CV32 pair selecting a 256-CV window of extended CV space
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProgrammingPage {
    /// Value written to CV31
    pub cv31: u8,
    /// Value written to CV32
    pub cv32: u8,
}

impl ProgrammingPage {
    /// Create a page selector from its CV31/CV32 values
    pub fn new(cv31: u8, cv32: u8) -> Self {
        Self { cv31, cv32 }
    }
}

impl std::fmt::Display for ProgrammingPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.cv31, self.cv32)
    }
}

/// How a CV write is checked against the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VerifyPolicy {
    /// Transmit only; the transport acknowledgment is the only evidence
    None,
    /// Read first and skip the transmission if the CV already matches
    VerifyBeforeWrite,
    /// Read back after transmitting and require an exact match
    #[default]
    VerifyAfterWrite,
    /// Both of the above
    VerifyBoth,
}

impl VerifyPolicy {
    /// Whether the policy reads the CV before transmitting
    pub fn reads_before(&self) -> bool {
        matches!(self, Self::VerifyBeforeWrite | Self::VerifyBoth)
    }

    /// Whether the policy reads the CV back after transmitting
    pub fn reads_after(&self) -> bool {
        matches!(self, Self::VerifyAfterWrite | Self::VerifyBoth)
    }
}

/// Per-operation-class ceilings on transport attempts
///
/// Multi-byte XPOM blocks get a larger budget than single-CV operations;
/// the longer the feedback frame, the higher the chance that at least one
/// piece of it arrives corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetryBudgets {
    /// Attempts allowed for a single-CV read or write transmission
    pub single_cv: u32,
    /// Attempts allowed for a whole XPOM block read
    pub xpom_block: u32,
}

impl Default for RetryBudgets {
    fn default() -> Self {
        Self {
            single_cv: 10,
            xpom_block: 20,
        }
    }
}

/// Advisory counters over one programming session
///
/// Reported to the operator for diagnostics; never consulted for control
/// flow. Reset at the start of each read or commit pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReadStatistics {
    /// Total read attempts issued to the transport
    pub reads: u64,
    /// Total failed attempts, reads and write transmissions alike
    pub retries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_range() {
        assert!(DecoderAddress::new(1).is_ok());
        assert!(DecoderAddress::new(9999).is_ok());
        assert_eq!(DecoderAddress::new(0), Err(InvalidAddress(0)));
        assert_eq!(DecoderAddress::new(10000), Err(InvalidAddress(10000)));
    }

    #[test]
    fn test_cv_ranges() {
        assert!(CvNumber::new(1).is_ok());
        assert!(CvNumber::new(1024).is_ok());
        assert!(CvNumber::new(0).is_err());
        assert!(CvNumber::new(1025).is_err());

        assert!(CvNumber::direct(255).is_ok());
        assert_eq!(
            CvNumber::direct(256),
            Err(InvalidCv { cv: 256, limit: 255 })
        );
    }

    #[test]
    fn test_paged_cv_window() {
        assert_eq!(CvNumber::paged(0).get(), 257);
        assert_eq!(CvNumber::paged(255).get(), 512);
        assert!(CvNumber::paged(0).is_paged());
        assert!(!CvNumber::CV31.is_paged());
    }

    #[test]
    fn test_verify_policy_flags() {
        assert!(!VerifyPolicy::None.reads_before());
        assert!(!VerifyPolicy::None.reads_after());
        assert!(VerifyPolicy::VerifyBeforeWrite.reads_before());
        assert!(VerifyPolicy::VerifyAfterWrite.reads_after());
        assert!(VerifyPolicy::VerifyBoth.reads_before());
        assert!(VerifyPolicy::VerifyBoth.reads_after());
    }
}
