//! Single-attempt packet/ack transport interface
//!
//! The transport owns DCC packet encoding, track-signal generation and
//! feedback demodulation. Every call here is exactly one attempt against
//! the rails; timeouts are the transport's business and surface as a
//! failed attempt (`None`/`false`). Retry is exclusively [`CvAccess`]'s
//! responsibility.
//!
//! [`CvAccess`]: crate::CvAccess

use crate::types::{CvNumber, DecoderAddress, ProgrammingPage};

/// One-shot CV access against the track bus
pub trait CvTransport {
    /// Read one CV; `None` when no decodable feedback frame arrived
    fn read_cv(&mut self, addr: DecoderAddress, cv: CvNumber) -> Option<u8>;

    /// Write one CV; `false` when the transmission was not acknowledged
    fn write_cv(&mut self, addr: DecoderAddress, cv: CvNumber, value: u8) -> bool;

    /// Read `quads` quads (4 bytes each) starting at `offset` within the
    /// CV window named by `page`; `None` when any part of the block was
    /// missing or garbled
    fn xpom_read(
        &mut self,
        addr: DecoderAddress,
        quads: u8,
        page: ProgrammingPage,
        offset: u16,
    ) -> Option<Vec<u8>>;
}
