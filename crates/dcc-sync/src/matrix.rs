//! Configuration matrix with snapshot/staging buffers
//!
//! Holds a decoder's mapping table twice: `snapshot` is the last state
//! confirmed on the decoder, `staging` carries the operator's pending
//! edits. The `pending_changes` counter is maintained incrementally on
//! every staging mutation, so the UI can show a live change count without
//! scanning the table.

use crate::error::SyncError;

/// One cell currently differing between snapshot and staging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellDiff {
    pub line: u8,
    pub col: u8,
    /// Last confirmed decoder value
    pub old: u8,
    /// Staged operator value
    pub new: u8,
}

/// A decoder mapping table with confirmed and staged buffers
///
/// Owned by one programming session; the decoder itself is the durable
/// store, the matrix is discarded with the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationMatrix {
    lines: u8,
    columns: u8,
    snapshot: Vec<Vec<u8>>,
    staging: Vec<Vec<u8>>,
    pending_changes: usize,
}

impl ConfigurationMatrix {
    /// Create a zeroed matrix with no pending changes
    pub fn new(lines: u8, columns: u8) -> Self {
        let zeroed = vec![vec![0u8; columns as usize]; lines as usize];
        Self {
            lines,
            columns,
            snapshot: zeroed.clone(),
            staging: zeroed,
            pending_changes: 0,
        }
    }

    /// Build a matrix from a freshly read snapshot
    ///
    /// Staging starts out identical to the snapshot. Rows are normalized
    /// to the length of the first row.
    pub fn from_snapshot(mut snapshot: Vec<Vec<u8>>) -> Self {
        let lines = snapshot.len().min(u8::MAX as usize) as u8;
        snapshot.truncate(lines as usize);
        let columns = snapshot
            .first()
            .map(|row| row.len().min(u8::MAX as usize))
            .unwrap_or(0) as u8;
        for row in &mut snapshot {
            row.resize(columns as usize, 0);
        }
        let staging = snapshot.clone();
        Self {
            lines,
            columns,
            snapshot,
            staging,
            pending_changes: 0,
        }
    }

    /// Number of lines
    pub fn lines(&self) -> u8 {
        self.lines
    }

    /// Number of byte columns per line
    pub fn columns(&self) -> u8 {
        self.columns
    }

    /// Live count of cells where staging differs from the snapshot
    pub fn pending_changes(&self) -> usize {
        self.pending_changes
    }

    /// Discard all staged edits: `staging := snapshot`
    pub fn begin(&mut self) {
        self.staging = self.snapshot.clone();
        self.pending_changes = 0;
    }

    /// Stage an operator edit; never touches the decoder
    pub fn stage(&mut self, line: u8, col: u8, value: u8) -> Result<(), SyncError> {
        let (l, c) = self.index(line, col)?;
        let was = self.staging[l][c];
        if was == value {
            return Ok(());
        }
        let confirmed = self.snapshot[l][c];
        if was == confirmed {
            // Cell newly differs from the snapshot.
            self.pending_changes += 1;
        } else if value == confirmed {
            // Edit brought the cell back to its confirmed value.
            self.pending_changes -= 1;
        }
        self.staging[l][c] = value;
        Ok(())
    }

    /// Staged value of a cell
    pub fn staged(&self, line: u8, col: u8) -> Option<u8> {
        let (l, c) = self.index(line, col).ok()?;
        Some(self.staging[l][c])
    }

    /// Last confirmed decoder value of a cell
    pub fn snapshot_value(&self, line: u8, col: u8) -> Option<u8> {
        let (l, c) = self.index(line, col).ok()?;
        Some(self.snapshot[l][c])
    }

    /// Mark one cell's staged value as confirmed on the decoder
    ///
    /// Used by the commit loop after a verified write; the cell drops out
    /// of [`diffs`](Self::diffs) and the pending counter. A no-op for
    /// unchanged or out-of-range cells.
    pub fn confirm(&mut self, line: u8, col: u8) {
        let Ok((l, c)) = self.index(line, col) else {
            return;
        };
        if self.snapshot[l][c] != self.staging[l][c] {
            self.snapshot[l][c] = self.staging[l][c];
            self.pending_changes -= 1;
        }
    }

    /// All cells currently differing between snapshot and staging, in
    /// row-major order
    ///
    /// Computed by direct comparison on each call: re-iterating reflects
    /// the current state, not a frozen view.
    pub fn diffs(&self) -> impl Iterator<Item = CellDiff> + '_ {
        self.snapshot
            .iter()
            .zip(self.staging.iter())
            .enumerate()
            .flat_map(|(line, (confirmed, staged))| {
                confirmed
                    .iter()
                    .zip(staged.iter())
                    .enumerate()
                    .filter(|(_, (old, new))| old != new)
                    .map(move |(col, (old, new))| CellDiff {
                        line: line as u8,
                        col: col as u8,
                        old: *old,
                        new: *new,
                    })
            })
    }

    fn index(&self, line: u8, col: u8) -> Result<(usize, usize), SyncError> {
        if line >= self.lines || col >= self.columns {
            return Err(SyncError::CellOutOfRange {
                line,
                col,
                lines: self.lines,
                columns: self.columns,
            });
        }
        Ok((line as usize, col as usize))
    }
}
