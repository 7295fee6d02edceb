//! Manufacturer function-mapping layouts
//!
//! Each supported vendor ships its own mapping-table shape: line count,
//! bytes per line, CV numbering and paging scheme. Everything the
//! synchronization engine needs is expressed here as data plus pure
//! addressing functions; the read/commit loops never branch on the vendor
//! themselves.
//!
//! # Shapes
//! - **ESU**: 16/32/72 condition+output rows of 16 bytes, read as one
//!   4-quad XPOM block per row on pages (16, 3..)
//! - **Lenz**: 31 single-byte output rows on direct CVs, no paging
//! - **ZIMO**: 14 single-byte output rows on direct CVs, no paging
//! - **TAMS**: 18 rows of 4 bytes on page (0, 40) or (0, 42) depending on
//!   the CV96 mode, with a local-only function-index column; writes go
//!   through a window two pages above the read window

use crate::types::{CvNumber, ProgrammingPage};

/// ESU function-mapping pages start at CV32 = 3, with CV31 = 16
const ESU_PAGE_CV31: u8 = 16;
const ESU_FIRST_PAGE_CV32: u8 = 3;
/// Rows per 256-CV page in the ESU table (16 bytes each)
const ESU_ROWS_PER_PAGE: u8 = 16;
const ESU_BYTES_PER_ROW: u8 = 16;

/// Lenz output table: 15-line and 16-line sub-tables, contiguous in CV space
const LENZ_LINES: u8 = 31;
/// ZIMO output table lines
const ZIMO_LINES: u8 = 14;
/// First CV of the standard function-output tables
const OUTPUT_TABLE_BASE_CV: u16 = 33;

const TAMS_LINES: u8 = 18;
const TAMS_COLUMNS: u8 = 4;
/// The free-text function-index column; not backed by a CV
const TAMS_INDEX_COLUMN: u8 = 1;
/// TAMS writes land in the window two pages above the read window
const TAMS_WRITE_PAGE_OFFSET: u8 = 2;

/// Decoder manufacturers with a supported mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vendor {
    /// ESU (CV8 = 151)
    Esu,
    /// Lenz (CV8 = 99)
    Lenz,
    /// ZIMO (CV8 = 145)
    Zimo,
    /// TAMS (CV8 = 62)
    Tams,
}

impl Vendor {
    /// Look a vendor up by its NMRA manufacturer ID (CV8)
    pub fn from_manufacturer_id(id: u8) -> Option<Vendor> {
        match id {
            151 => Some(Vendor::Esu),
            99 => Some(Vendor::Lenz),
            145 => Some(Vendor::Zimo),
            62 => Some(Vendor::Tams),
            _ => None,
        }
    }

    /// The NMRA manufacturer ID reported in CV8
    pub fn manufacturer_id(&self) -> u8 {
        match self {
            Vendor::Esu => 151,
            Vendor::Lenz => 99,
            Vendor::Zimo => 145,
            Vendor::Tams => 62,
        }
    }

    /// Returns a human-readable name for the vendor
    pub fn name(&self) -> &'static str {
        match self {
            Vendor::Esu => "ESU",
            Vendor::Lenz => "Lenz",
            Vendor::Zimo => "ZIMO",
            Vendor::Tams => "TAMS",
        }
    }
}

/// How a layout's lines are fetched from the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReadStrategy {
    /// One `read_cv` per CV-backed cell
    ByteWise,
    /// One multi-quad XPOM transaction per line
    QuadBlock,
}

/// Where a single cell lives on the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellAddress {
    /// Programming page to select first; `None` for directly addressed CVs
    pub page: Option<ProgrammingPage>,
    /// The CV carrying the cell's byte
    pub cv: CvNumber,
}

/// Where a whole line lives, for block-read layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockAddress {
    /// Programming page to select first
    pub page: ProgrammingPage,
    /// Zero-based offset of the line within the page
    pub offset: u16,
    /// Quads (4 bytes each) covering the line
    pub quads: u8,
}

/// Shape and CV addressing of one vendor's mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DecoderLayout {
    /// ESU condition+output table
    Esu {
        /// Table length; 16, 32 or 72 rows depending on decoder family
        lines: u8,
    },
    /// Lenz output table
    Lenz,
    /// ZIMO output table
    Zimo,
    /// TAMS paged table
    Tams {
        /// CV32 value of the read window, 40 or 42 (selected via CV96)
        index_page: u8,
    },
}

impl DecoderLayout {
    /// ESU table of the given length; `None` unless 16, 32 or 72 rows
    pub fn esu(lines: u8) -> Option<DecoderLayout> {
        match lines {
            16 | 32 | 72 => Some(DecoderLayout::Esu { lines }),
            _ => None,
        }
    }

    /// TAMS table for a CV96 mode value; `None` for unsupported modes
    pub fn tams_for_mode(cv96: u8) -> Option<DecoderLayout> {
        match cv96 {
            2 => Some(DecoderLayout::Tams { index_page: 40 }),
            4 => Some(DecoderLayout::Tams { index_page: 42 }),
            _ => None,
        }
    }

    /// The vendor this layout belongs to
    pub fn vendor(&self) -> Vendor {
        match self {
            DecoderLayout::Esu { .. } => Vendor::Esu,
            DecoderLayout::Lenz => Vendor::Lenz,
            DecoderLayout::Zimo => Vendor::Zimo,
            DecoderLayout::Tams { .. } => Vendor::Tams,
        }
    }

    /// Number of lines in the table
    pub fn lines(&self) -> u8 {
        match self {
            DecoderLayout::Esu { lines } => *lines,
            DecoderLayout::Lenz => LENZ_LINES,
            DecoderLayout::Zimo => ZIMO_LINES,
            DecoderLayout::Tams { .. } => TAMS_LINES,
        }
    }

    /// Number of byte columns per line
    pub fn columns(&self) -> u8 {
        match self {
            DecoderLayout::Esu { .. } => ESU_BYTES_PER_ROW,
            DecoderLayout::Lenz | DecoderLayout::Zimo => 1,
            DecoderLayout::Tams { .. } => TAMS_COLUMNS,
        }
    }

    /// How lines are fetched during a read pass
    pub fn strategy(&self) -> ReadStrategy {
        match self {
            DecoderLayout::Esu { .. } => ReadStrategy::QuadBlock,
            _ => ReadStrategy::ByteWise,
        }
    }

    /// Where to read a cell from; `None` for cells that are not backed by
    /// a decoder CV (the TAMS function-index column)
    ///
    /// Coordinates are expected in range; out-of-range cells also yield
    /// `None`.
    pub fn read_cell(&self, line: u8, col: u8) -> Option<CellAddress> {
        if line >= self.lines() || col >= self.columns() {
            return None;
        }
        match self {
            DecoderLayout::Esu { .. } => Some(CellAddress {
                page: Some(esu_page(line)),
                cv: CvNumber::paged((line % ESU_ROWS_PER_PAGE) * ESU_BYTES_PER_ROW + col),
            }),
            DecoderLayout::Lenz | DecoderLayout::Zimo => Some(CellAddress {
                page: None,
                cv: CvNumber(OUTPUT_TABLE_BASE_CV + line as u16),
            }),
            DecoderLayout::Tams { index_page } => {
                if col == TAMS_INDEX_COLUMN {
                    return None;
                }
                Some(CellAddress {
                    page: Some(ProgrammingPage::new(0, *index_page)),
                    cv: CvNumber::paged(line * TAMS_COLUMNS + col),
                })
            }
        }
    }

    /// Where to write a cell to
    ///
    /// Identical to [`read_cell`](Self::read_cell) except for TAMS, whose
    /// writes must go through the window two pages above the read window.
    pub fn write_cell(&self, line: u8, col: u8) -> Option<CellAddress> {
        let cell = self.read_cell(line, col)?;
        match self {
            DecoderLayout::Tams { index_page } => Some(CellAddress {
                page: Some(ProgrammingPage::new(0, index_page + TAMS_WRITE_PAGE_OFFSET)),
                ..cell
            }),
            _ => Some(cell),
        }
    }

    /// Block address of a whole line; `None` for byte-wise layouts
    pub fn line_block(&self, line: u8) -> Option<BlockAddress> {
        if line >= self.lines() {
            return None;
        }
        match self {
            DecoderLayout::Esu { .. } => Some(BlockAddress {
                page: esu_page(line),
                offset: (line % ESU_ROWS_PER_PAGE) as u16 * ESU_BYTES_PER_ROW as u16,
                quads: ESU_BYTES_PER_ROW / 4,
            }),
            _ => None,
        }
    }
}

/// Page holding an ESU table row; 16 rows of 16 bytes fill one page
fn esu_page(line: u8) -> ProgrammingPage {
    ProgrammingPage::new(
        ESU_PAGE_CV31,
        ESU_FIRST_PAGE_CV32 + line / ESU_ROWS_PER_PAGE,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_ids_round_trip() {
        for vendor in [Vendor::Esu, Vendor::Lenz, Vendor::Zimo, Vendor::Tams] {
            assert_eq!(Vendor::from_manufacturer_id(vendor.manufacturer_id()), Some(vendor));
        }
        assert_eq!(Vendor::from_manufacturer_id(0), None);
        assert_eq!(Vendor::from_manufacturer_id(97), None);
    }

    #[test]
    fn test_esu_table_sizes() {
        assert!(DecoderLayout::esu(16).is_some());
        assert!(DecoderLayout::esu(32).is_some());
        assert!(DecoderLayout::esu(72).is_some());
        assert!(DecoderLayout::esu(17).is_none());
        assert!(DecoderLayout::esu(0).is_none());
    }

    #[test]
    fn test_esu_rows_page_over() {
        let layout = DecoderLayout::esu(72).unwrap();

        // Rows 0..=15 share page (16, 3); row 16 starts page (16, 4).
        let first = layout.read_cell(0, 0).unwrap();
        assert_eq!(first.page, Some(ProgrammingPage::new(16, 3)));
        assert_eq!(first.cv.get(), 257);

        let last_on_first_page = layout.read_cell(15, 15).unwrap();
        assert_eq!(last_on_first_page.page, Some(ProgrammingPage::new(16, 3)));
        assert_eq!(last_on_first_page.cv.get(), 512);

        let first_on_second_page = layout.read_cell(16, 0).unwrap();
        assert_eq!(first_on_second_page.page, Some(ProgrammingPage::new(16, 4)));
        assert_eq!(first_on_second_page.cv.get(), 257);

        let last = layout.read_cell(71, 15).unwrap();
        assert_eq!(last.page, Some(ProgrammingPage::new(16, 7)));
    }

    #[test]
    fn test_esu_line_blocks() {
        let layout = DecoderLayout::esu(32).unwrap();

        let block = layout.line_block(17).unwrap();
        assert_eq!(block.page, ProgrammingPage::new(16, 4));
        assert_eq!(block.offset, 16);
        assert_eq!(block.quads, 4);

        assert!(layout.line_block(32).is_none());
        assert_eq!(layout.strategy(), ReadStrategy::QuadBlock);
    }

    #[test]
    fn test_lenz_zimo_direct_cvs() {
        let lenz = DecoderLayout::Lenz;
        assert_eq!(lenz.lines(), 31);
        assert_eq!(lenz.columns(), 1);
        assert_eq!(lenz.strategy(), ReadStrategy::ByteWise);
        let cell = lenz.read_cell(30, 0).unwrap();
        assert_eq!(cell.page, None);
        assert_eq!(cell.cv.get(), 63);
        assert!(lenz.line_block(0).is_none());

        let zimo = DecoderLayout::Zimo;
        assert_eq!(zimo.lines(), 14);
        let cell = zimo.read_cell(13, 0).unwrap();
        assert_eq!(cell.page, None);
        assert_eq!(cell.cv.get(), 46);
        assert!(zimo.read_cell(14, 0).is_none());
    }

    #[test]
    fn test_tams_modes() {
        assert_eq!(
            DecoderLayout::tams_for_mode(2),
            Some(DecoderLayout::Tams { index_page: 40 })
        );
        assert_eq!(
            DecoderLayout::tams_for_mode(4),
            Some(DecoderLayout::Tams { index_page: 42 })
        );
        assert_eq!(DecoderLayout::tams_for_mode(0), None);
        assert_eq!(DecoderLayout::tams_for_mode(3), None);
    }

    #[test]
    fn test_tams_index_column_is_local_only() {
        let layout = DecoderLayout::tams_for_mode(2).unwrap();

        assert!(layout.read_cell(0, 1).is_none());
        assert!(layout.write_cell(7, 1).is_none());

        let cell = layout.read_cell(2, 3).unwrap();
        assert_eq!(cell.page, Some(ProgrammingPage::new(0, 40)));
        assert_eq!(cell.cv.get(), 257 + 2 * 4 + 3);
    }

    #[test]
    fn test_tams_writes_use_shifted_window() {
        let layout = DecoderLayout::tams_for_mode(2).unwrap();

        let read = layout.read_cell(5, 0).unwrap();
        let write = layout.write_cell(5, 0).unwrap();
        assert_eq!(read.page, Some(ProgrammingPage::new(0, 40)));
        assert_eq!(write.page, Some(ProgrammingPage::new(0, 42)));
        assert_eq!(read.cv, write.cv);
    }

    #[test]
    fn test_out_of_range_cells() {
        let layout = DecoderLayout::esu(16).unwrap();
        assert!(layout.read_cell(16, 0).is_none());
        assert!(layout.read_cell(0, 16).is_none());
    }
}
