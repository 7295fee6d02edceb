//! Progress events emitted by a programming session
//!
//! The engine itself is synchronous; these events let the caller (for
//! example a web handler streaming to a slow client) flush incremental
//! progress between blocking steps. Drained via
//! [`ProgrammingSession::drain_events`](crate::ProgrammingSession::drain_events).

use dcc_cv::{ProgrammingPage, Vendor};

/// Events emitted by a programming session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncEvent {
    /// The manufacturer probe identified a vendor
    ProbeCompleted { vendor: Vendor },
    /// A read pass started
    ReadStarted { lines: u8 },
    /// A CV31/CV32 page index was written to the decoder
    PageSelected { page: ProgrammingPage },
    /// One line of the mapping table was read
    LineRead { line: u8, total: u8 },
    /// The read pass finished and the snapshot was published
    MatrixPopulated { lines: u8 },
    /// A commit pass started
    CommitStarted { pending: usize },
    /// One changed cell was written and verified
    CellCommitted { line: u8, col: u8, value: u8 },
    /// The commit pass stopped at a failed cell; the rest stays pending
    CommitInterrupted { line: u8, col: u8, pending: usize },
    /// The commit pass drained every pending cell
    CommitCompleted,
}
