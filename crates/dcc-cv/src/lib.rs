//! DCC CV Access Library
//!
//! This crate provides the low-level building blocks for reading and writing
//! decoder Configuration Variables (CVs) "on the main" (POM) while trains
//! keep running:
//!
//! - **`CvTransport`**: the single-attempt packet/ack interface supplied by
//!   the track-signal layer
//! - **`CvAccess`**: bounded retries, verification policies, CV31/CV32
//!   paging and XPOM block reads on top of a transport
//! - **`DecoderLayout`**: per-manufacturer function-mapping table shapes
//!   (ESU, Lenz, ZIMO, TAMS) and their CV addressing
//!
//! Decoder feedback rides on the rails, so any single attempt may come back
//! garbled or not at all. `CvAccess` turns that lossy channel into definite
//! `Result`s: a call either yields a decoded value or a typed error, never a
//! partial or defaulted one.
//!
//! # Example
//!
//! ```rust
//! use dcc_cv::{CvAccess, CvNumber, CvTransport, DecoderAddress, ProgrammingPage, VerifyPolicy};
//!
//! /// A transport that answers immediately from local memory.
//! struct Loopback([u8; 256]);
//!
//! impl CvTransport for Loopback {
//!     fn read_cv(&mut self, _addr: DecoderAddress, cv: CvNumber) -> Option<u8> {
//!         Some(self.0[cv.get() as usize % 256])
//!     }
//!
//!     fn write_cv(&mut self, _addr: DecoderAddress, cv: CvNumber, value: u8) -> bool {
//!         self.0[cv.get() as usize % 256] = value;
//!         true
//!     }
//!
//!     fn xpom_read(
//!         &mut self,
//!         _addr: DecoderAddress,
//!         quads: u8,
//!         _page: ProgrammingPage,
//!         _offset: u16,
//!     ) -> Option<Vec<u8>> {
//!         Some(vec![0; 4 * quads as usize])
//!     }
//! }
//!
//! let mut access = CvAccess::new(Loopback([0; 256]));
//! let addr = DecoderAddress::new(3)?;
//!
//! access.write_cv(addr, CvNumber::new(29)?, 0x0E, VerifyPolicy::VerifyBoth)?;
//! assert_eq!(access.read_cv(addr, CvNumber::new(29)?)?, 0x0E);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod access;
pub mod error;
pub mod layout;
pub mod transport;
pub mod types;

pub use access::CvAccess;
pub use error::{InvalidAddress, InvalidCv, ReadError, WriteError};
pub use layout::{BlockAddress, CellAddress, DecoderLayout, ReadStrategy, Vendor};
pub use transport::CvTransport;
pub use types::{CvNumber, DecoderAddress, ProgrammingPage, ReadStatistics, RetryBudgets, VerifyPolicy};
