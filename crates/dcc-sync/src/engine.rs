//! Programming session engine
//!
//! Drives the CV access layer against one decoder: manufacturer probing,
//! the full-table read pass, operator staging and the diff-only commit
//! pass. One session per decoder address; all decoder I/O within a
//! session is strictly sequential.
//!
//! Page discipline: within a pass, lines and cells are visited in
//! ascending row-major order and the CV31/CV32 index is rewritten only
//! when the required page differs from the page last written in the same
//! pass. The "last page" hint never survives into the next pass.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use dcc_cv::{
    CvAccess, CvNumber, CvTransport, DecoderAddress, DecoderLayout, ProgrammingPage,
    ReadStatistics, RetryBudgets, VerifyPolicy, WriteError,
};
use dcc_detect::{LayoutProber, ProbeConfig, ProbeResult};

use crate::error::SyncError;
use crate::events::SyncEvent;
use crate::matrix::{CellDiff, ConfigurationMatrix};

/// Programming session configuration
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Retry budgets handed to the CV access layer
    pub budgets: RetryBudgets,
    /// Probe configuration
    pub probe: ProbeConfig,
}

/// A populated mapping table together with the layout it was read under
struct PopulatedMatrix {
    layout: DecoderLayout,
    matrix: ConfigurationMatrix,
}

/// A decoder programming session
///
/// Owns the transport, the retry layer and the matrix, so concurrent UI
/// sessions against different decoders cannot alias each other's state.
pub struct ProgrammingSession<T: CvTransport> {
    config: SessionConfig,
    access: CvAccess<T>,
    addr: DecoderAddress,
    populated: Option<PopulatedMatrix>,
    events: Vec<SyncEvent>,
}

impl<T: CvTransport> ProgrammingSession<T> {
    /// Open a session with default configuration
    pub fn new(transport: T, address: u16) -> Result<Self, SyncError> {
        Self::with_config(transport, address, SessionConfig::default())
    }

    /// Open a session with custom configuration
    pub fn with_config(
        transport: T,
        address: u16,
        config: SessionConfig,
    ) -> Result<Self, SyncError> {
        let addr = DecoderAddress::new(address)?;
        Ok(Self {
            access: CvAccess::with_budgets(transport, config.budgets),
            config,
            addr,
            populated: None,
            events: Vec::new(),
        })
    }

    /// The decoder address this session is bound to
    pub fn address(&self) -> u16 {
        self.addr.get()
    }

    /// Get the current configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The populated matrix, if a read pass has completed
    pub fn matrix(&self) -> Option<&ConfigurationMatrix> {
        self.populated.as_ref().map(|p| &p.matrix)
    }

    /// The layout the matrix was read under
    pub fn layout(&self) -> Option<DecoderLayout> {
        self.populated.as_ref().map(|p| p.layout)
    }

    /// Probe the decoder for its vendor and mapping layout
    pub fn probe(&mut self) -> Result<ProbeResult, SyncError> {
        let result =
            LayoutProber::with_config(self.config.probe).probe(&mut self.access, self.addr)?;
        self.events.push(SyncEvent::ProbeCompleted {
            vendor: result.vendor,
        });
        Ok(result)
    }

    /// Read the whole mapping table from the decoder
    ///
    /// The pass is atomic: either every line is read and the snapshot is
    /// replaced wholesale, or the first failure aborts it and any
    /// previously populated matrix stays untouched.
    pub fn read_matrix(&mut self, layout: DecoderLayout) -> Result<(), SyncError> {
        self.access.reset_counters();
        let lines = layout.lines();
        let columns = layout.columns();
        info!(
            "reading {} x {} mapping table from decoder {}",
            lines, columns, self.addr
        );
        self.events.push(SyncEvent::ReadStarted { lines });

        let mut last_page: Option<ProgrammingPage> = None;
        let mut snapshot: Vec<Vec<u8>> = Vec::with_capacity(lines as usize);
        for line in 0..lines {
            let mut row = vec![0u8; columns as usize];
            if let Some(block) = layout.line_block(line) {
                select_page(
                    &mut self.access,
                    self.addr,
                    &mut last_page,
                    Some(block.page),
                    &mut self.events,
                )?;
                let bytes =
                    self.access
                        .xpom_read_block(self.addr, block.quads, block.page, block.offset)?;
                for (cell, byte) in row.iter_mut().zip(&bytes) {
                    *cell = *byte;
                }
            } else {
                for col in 0..columns {
                    // Cells without a backing CV stay zero.
                    if let Some(cell) = layout.read_cell(line, col) {
                        select_page(
                            &mut self.access,
                            self.addr,
                            &mut last_page,
                            cell.page,
                            &mut self.events,
                        )?;
                        row[col as usize] = self.access.read_cv(self.addr, cell.cv)?;
                    }
                }
            }
            snapshot.push(row);
            self.events.push(SyncEvent::LineRead { line, total: lines });
        }

        self.populated = Some(PopulatedMatrix {
            layout,
            matrix: ConfigurationMatrix::from_snapshot(snapshot),
        });
        self.events.push(SyncEvent::MatrixPopulated { lines });
        info!("mapping table of decoder {} populated", self.addr);
        Ok(())
    }

    /// Stage one operator edit; no decoder I/O
    pub fn stage_cell(&mut self, line: u8, col: u8, value: u8) -> Result<(), SyncError> {
        let populated = self.populated.as_mut().ok_or(SyncError::NotPopulated)?;
        populated.matrix.stage(line, col, value)
    }

    /// Live count of cells still differing from the decoder
    pub fn pending_change_count(&self) -> usize {
        self.populated
            .as_ref()
            .map_or(0, |p| p.matrix.pending_changes())
    }

    /// Write every staged change back to the decoder
    ///
    /// Only differing cells are transmitted, in row-major order, each
    /// under `VerifyAfterWrite`. The first failure stops the pass:
    /// already-written cells stay confirmed in the snapshot, the rest
    /// stays pending, and a later `commit` resumes with exactly the
    /// remaining cells. Returns the number of cells still pending.
    pub fn commit(&mut self) -> Result<usize, SyncError> {
        let populated = self.populated.as_mut().ok_or(SyncError::NotPopulated)?;
        self.access.reset_counters();

        let diffs: Vec<CellDiff> = populated.matrix.diffs().collect();
        info!(
            "committing {} changed cells to decoder {}",
            diffs.len(),
            self.addr
        );
        self.events.push(SyncEvent::CommitStarted {
            pending: diffs.len(),
        });

        let mut last_page: Option<ProgrammingPage> = None;
        for diff in diffs {
            let Some(cell) = populated.layout.write_cell(diff.line, diff.col) else {
                // Local-only cell (e.g. the TAMS function-index column):
                // nothing to transmit, the staged value becomes confirmed.
                populated.matrix.confirm(diff.line, diff.col);
                continue;
            };

            let written = select_page(
                &mut self.access,
                self.addr,
                &mut last_page,
                cell.page,
                &mut self.events,
            )
            .and_then(|_| {
                self.access
                    .write_cv(self.addr, cell.cv, diff.new, VerifyPolicy::VerifyAfterWrite)
            });

            if let Err(err) = written {
                let pending = populated.matrix.pending_changes();
                warn!(
                    "commit to decoder {} halted at cell ({}, {}): {} ({} cells still pending)",
                    self.addr, diff.line, diff.col, err, pending
                );
                self.events.push(SyncEvent::CommitInterrupted {
                    line: diff.line,
                    col: diff.col,
                    pending,
                });
                return Err(err.into());
            }

            populated.matrix.confirm(diff.line, diff.col);
            self.events.push(SyncEvent::CellCommitted {
                line: diff.line,
                col: diff.col,
                value: diff.new,
            });
        }

        let pending = populated.matrix.pending_changes();
        self.events.push(SyncEvent::CommitCompleted);
        info!("commit to decoder {} complete", self.addr);
        Ok(pending)
    }

    /// Read one directly addressable CV (1..=255)
    pub fn read_single_cv(&mut self, cv: u16) -> Result<u8, SyncError> {
        let cv = CvNumber::direct(cv)?;
        Ok(self.access.read_cv(self.addr, cv)?)
    }

    /// Write one directly addressable CV (1..=255)
    pub fn write_single_cv(
        &mut self,
        cv: u16,
        value: u8,
        policy: VerifyPolicy,
    ) -> Result<(), SyncError> {
        let cv = CvNumber::direct(cv)?;
        Ok(self.access.write_cv(self.addr, cv, value, policy)?)
    }

    /// Advisory counters for the current/last pass
    pub fn stats(&self) -> ReadStatistics {
        self.access.stats()
    }

    /// Reset the advisory counters
    pub fn reset_counters(&mut self) {
        self.access.reset_counters();
    }

    /// Drain pending progress events
    pub fn drain_events(&mut self) -> Vec<SyncEvent> {
        std::mem::take(&mut self.events)
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        self.access.transport()
    }

    /// Mutably borrow the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        self.access.transport_mut()
    }
}

/// Write the CV31/CV32 index iff `page` differs from the last page
/// written in this pass
///
/// Direct CVs (`page == None`) need no window and leave the hint alone.
fn select_page<T: CvTransport>(
    access: &mut CvAccess<T>,
    addr: DecoderAddress,
    last: &mut Option<ProgrammingPage>,
    page: Option<ProgrammingPage>,
    events: &mut Vec<SyncEvent>,
) -> Result<(), WriteError> {
    let Some(page) = page else {
        return Ok(());
    };
    if *last == Some(page) {
        return Ok(());
    }
    access.write_cv_index(addr, page)?;
    *last = Some(page);
    events.push(SyncEvent::PageSelected { page });
    Ok(())
}
