//! Virtual decoder simulation
//!
//! Provides a simulated decoder whose CV stores, page latch and feedback
//! behavior mirror real hardware closely enough to exercise retry,
//! verification and paging logic. Faults are scripted per attempt, and
//! every transport call is logged so tests can assert exact traffic.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use dcc_cv::{CvNumber, CvTransport, DecoderAddress, ProgrammingPage};

/// One transport call as seen by the simulated decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOp {
    /// Single-CV read attempt
    ReadCv { addr: u16, cv: u16 },
    /// Single-CV write attempt
    WriteCv { addr: u16, cv: u16, value: u8 },
    /// XPOM block read attempt
    XpomRead {
        addr: u16,
        quads: u8,
        cv31: u8,
        cv32: u8,
        offset: u16,
    },
}

/// Configuration for creating a virtual decoder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VirtualDecoderConfig {
    /// Bus address the decoder answers on
    pub address: u16,
    /// Manufacturer ID reported in CV8
    pub manufacturer_id: u8,
    /// CV96 mode value, for TAMS decoders
    pub cv96: Option<u8>,
}

impl Default for VirtualDecoderConfig {
    fn default() -> Self {
        Self {
            address: 3,
            manufacturer_id: 151, // ESU
            cv96: None,
        }
    }
}

/// A simulated decoder that answers CV traffic from memory
#[derive(Debug, Default)]
pub struct VirtualDecoder {
    address: u16,
    /// Directly addressed CVs 1..=255, including the CV31/CV32 page latch
    direct: HashMap<u16, u8>,
    /// Paged CV windows keyed by their (CV31, CV32) selector
    paged: HashMap<(u8, u8), HashMap<u16, u8>>,
    /// Attempts left to drop for reads (single-CV and XPOM alike)
    read_faults: u32,
    /// Attempts left to drop for writes
    write_faults: u32,
    /// CVs whose writes are never acknowledged
    poisoned_writes: HashSet<u16>,
    /// CVs that acknowledge writes but keep their value
    read_only: HashSet<u16>,
    log: Vec<TransportOp>,
}

impl VirtualDecoder {
    /// Create a decoder listening on the given bus address
    pub fn new(address: u16) -> Self {
        Self {
            address,
            ..Self::default()
        }
    }

    /// Create a decoder from configuration, with CV8/CV96 seeded
    pub fn from_config(config: VirtualDecoderConfig) -> Self {
        let mut decoder = Self::new(config.address);
        decoder.set_cv(8, config.manufacturer_id);
        if let Some(cv96) = config.cv96 {
            decoder.set_cv(96, cv96);
        }
        decoder
    }

    /// Seed or overwrite a direct CV (1..=255)
    pub fn set_cv(&mut self, cv: u16, value: u8) {
        self.direct.insert(cv, value);
    }

    /// Seed or overwrite a CV inside a paged window
    pub fn set_paged_cv(&mut self, cv31: u8, cv32: u8, offset: u16, value: u8) {
        self.paged
            .entry((cv31, cv32))
            .or_default()
            .insert(offset, value);
    }

    /// Seed a run of bytes inside a paged window
    pub fn load_line(&mut self, cv31: u8, cv32: u8, offset: u16, bytes: &[u8]) {
        for (i, byte) in bytes.iter().enumerate() {
            self.set_paged_cv(cv31, cv32, offset + i as u16, *byte);
        }
    }

    /// Current value of a direct CV (unset CVs read as 0)
    pub fn cv(&self, cv: u16) -> u8 {
        self.direct.get(&cv).copied().unwrap_or(0)
    }

    /// Current value of a CV inside a paged window
    pub fn paged_cv(&self, cv31: u8, cv32: u8, offset: u16) -> u8 {
        self.paged
            .get(&(cv31, cv32))
            .and_then(|window| window.get(&offset))
            .copied()
            .unwrap_or(0)
    }

    /// Drop the next `attempts` read attempts (single-CV and XPOM)
    pub fn fail_next_reads(&mut self, attempts: u32) {
        debug!("scripting {} dropped read attempts", attempts);
        self.read_faults = attempts;
    }

    /// Refuse the next `attempts` write attempts
    pub fn fail_next_writes(&mut self, attempts: u32) {
        debug!("scripting {} refused write attempts", attempts);
        self.write_faults = attempts;
    }

    /// Never acknowledge writes to the given CV until healed
    pub fn poison_write(&mut self, cv: u16) {
        debug!("poisoning writes to CV{}", cv);
        self.poisoned_writes.insert(cv);
    }

    /// Acknowledge writes to the given CV again
    pub fn heal_write(&mut self, cv: u16) {
        self.poisoned_writes.remove(&cv);
    }

    /// Make a CV acknowledge writes without changing its value
    ///
    /// Real decoders do this for fixed CVs such as CV7/CV8; a read-back
    /// after such a write exposes the mismatch.
    pub fn set_read_only(&mut self, cv: u16) {
        debug!("marking CV{} read-only", cv);
        self.read_only.insert(cv);
    }

    /// All transport calls seen so far
    pub fn log(&self) -> &[TransportOp] {
        &self.log
    }

    /// Drain the transport-call log
    pub fn take_log(&mut self) -> Vec<TransportOp> {
        std::mem::take(&mut self.log)
    }

    /// The page latch as currently written via CV31/CV32
    fn page_latch(&self) -> (u8, u8) {
        (self.cv(31), self.cv(32))
    }

    /// Resolve a CV number against the direct store or the latched window
    fn load(&self, cv: u16) -> u8 {
        if cv <= 255 {
            return self.cv(cv);
        }
        match cv.checked_sub(257) {
            Some(offset) => {
                let (cv31, cv32) = self.page_latch();
                self.paged_cv(cv31, cv32, offset)
            }
            None => 0,
        }
    }

    fn store(&mut self, cv: u16, value: u8) {
        if self.read_only.contains(&cv) {
            return;
        }
        if cv <= 255 {
            self.direct.insert(cv, value);
            return;
        }
        if let Some(offset) = cv.checked_sub(257) {
            let (cv31, cv32) = self.page_latch();
            self.paged.entry((cv31, cv32)).or_default().insert(offset, value);
        }
    }
}

impl CvTransport for VirtualDecoder {
    fn read_cv(&mut self, addr: DecoderAddress, cv: CvNumber) -> Option<u8> {
        self.log.push(TransportOp::ReadCv {
            addr: addr.get(),
            cv: cv.get(),
        });
        if self.read_faults > 0 {
            self.read_faults -= 1;
            return None;
        }
        if addr.get() != self.address {
            return None;
        }
        Some(self.load(cv.get()))
    }

    fn write_cv(&mut self, addr: DecoderAddress, cv: CvNumber, value: u8) -> bool {
        self.log.push(TransportOp::WriteCv {
            addr: addr.get(),
            cv: cv.get(),
            value,
        });
        if self.write_faults > 0 {
            self.write_faults -= 1;
            return false;
        }
        if addr.get() != self.address || self.poisoned_writes.contains(&cv.get()) {
            return false;
        }
        self.store(cv.get(), value);
        true
    }

    fn xpom_read(
        &mut self,
        addr: DecoderAddress,
        quads: u8,
        page: ProgrammingPage,
        offset: u16,
    ) -> Option<Vec<u8>> {
        self.log.push(TransportOp::XpomRead {
            addr: addr.get(),
            quads,
            cv31: page.cv31,
            cv32: page.cv32,
            offset,
        });
        if self.read_faults > 0 {
            self.read_faults -= 1;
            return None;
        }
        if addr.get() != self.address {
            return None;
        }
        let bytes = (0..4 * quads as u16)
            .map(|i| self.paged_cv(page.cv31, page.cv32, offset + i))
            .collect();
        Some(bytes)
    }
}
