//! DCC Bulk Configuration Synchronization Engine
//!
//! This crate orchestrates the CV access layer against a decoder's
//! function-mapping table:
//!
//! - **probe**: identify the manufacturer (CV8, plus CV96 for TAMS) and
//!   pick the matching table layout
//! - **read**: fill a snapshot of the whole table, paging and retrying as
//!   needed, atomically; a failed pass never publishes a partial matrix
//! - **stage**: accept operator edits into a staging buffer with a live
//!   pending-change counter, without touching the decoder
//! - **commit**: write back only the cells that actually differ,
//!   minimizing CV31/CV32 page traffic, resumable after a failed write
//!
//! The engine is synchronous and strictly sequential per session; the
//! track bus is half-duplex and a decoder must never see an access under
//! the wrong programming page.
//!
//! # Example
//!
//! ```rust
//! use dcc_sim::VirtualDecoder;
//! use dcc_sync::ProgrammingSession;
//!
//! let mut decoder = VirtualDecoder::new(3);
//! decoder.set_cv(8, 145); // ZIMO
//!
//! let mut session = ProgrammingSession::new(decoder, 3)?;
//! let probe = session.probe()?;
//! session.read_matrix(probe.layout)?;
//!
//! session.stage_cell(2, 0, 0x05)?;
//! assert_eq!(session.pending_change_count(), 1);
//!
//! let still_pending = session.commit()?;
//! assert_eq!(still_pending, 0);
//! # Ok::<(), dcc_sync::SyncError>(())
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod matrix;

pub use engine::{ProgrammingSession, SessionConfig};
pub use error::SyncError;
pub use events::SyncEvent;
pub use matrix::{CellDiff, ConfigurationMatrix};
