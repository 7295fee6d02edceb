//! DCC Decoder Simulation Library
//!
//! This crate provides a simulation layer for testing CV access and bulk
//! synchronization without track hardware. It includes:
//!
//! - **VirtualDecoder**: an in-memory decoder with direct and paged CV
//!   stores, a CV31/CV32 page latch that behaves like the real thing,
//!   scriptable transport faults and a transport-call log
//!
//! # Example
//!
//! ```rust
//! use dcc_cv::{CvNumber, CvTransport, DecoderAddress};
//! use dcc_sim::VirtualDecoder;
//!
//! let mut decoder = VirtualDecoder::new(3);
//! decoder.set_cv(8, 151); // ESU
//!
//! let addr = DecoderAddress::new(3).unwrap();
//! assert_eq!(decoder.read_cv(addr, CvNumber::CV8), Some(151));
//!
//! // A decoder at a different address stays silent.
//! let other = DecoderAddress::new(4).unwrap();
//! assert_eq!(decoder.read_cv(other, CvNumber::CV8), None);
//! ```

pub mod decoder;

pub use decoder::{TransportOp, VirtualDecoder, VirtualDecoderConfig};
