//! DCC Decoder Detection Library
//!
//! This crate probes a decoder address for its manufacturer and selects
//! the matching function-mapping layout: CV8 names the vendor, and for
//! TAMS an additional CV96 read picks between the two supported table
//! windows.
//!
//! # Example
//!
//! ```rust,no_run
//! use dcc_cv::{CvAccess, DecoderAddress};
//! use dcc_detect::LayoutProber;
//!
//! # fn probe<T: dcc_cv::CvTransport>(transport: T) -> Result<(), Box<dyn std::error::Error>> {
//! let mut access = CvAccess::new(transport);
//! let addr = DecoderAddress::new(3)?;
//!
//! let result = LayoutProber::new().probe(&mut access, addr)?;
//! println!("{} decoder, {} mapping lines", result.vendor.name(), result.layout.lines());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod probe;

pub use error::ProbeError;
pub use probe::{LayoutProber, ProbeConfig, ProbeResult};
