//! Manufacturer probing for layout selection
//!
//! Reads the identification CVs of a decoder through the retrying access
//! layer and maps them to a [`DecoderLayout`]. A failed probe performs no
//! further transport traffic.

use tracing::{debug, info};

use dcc_cv::{CvAccess, CvNumber, CvTransport, DecoderAddress, DecoderLayout, Vendor};

use crate::error::ProbeError;

/// Result of probing a decoder address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    /// Identified vendor
    pub vendor: Vendor,
    /// Raw CV8 value
    pub manufacturer_id: u8,
    /// Mapping-table layout to use with this decoder
    pub layout: DecoderLayout,
}

/// Configuration for probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ProbeConfig {
    /// Table length assumed for ESU decoders (16, 32 or 72 lines)
    ///
    /// CV8 does not distinguish the ESU decoder families; operators of
    /// the smaller tables override this per decoder.
    pub esu_lines: u8,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { esu_lines: 72 }
    }
}

/// Decoder vendor/layout prober
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutProber {
    config: ProbeConfig,
}

impl LayoutProber {
    /// Create a new prober with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a prober with custom configuration
    pub fn with_config(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Probe a decoder for its vendor and mapping layout
    pub fn probe<T: CvTransport>(
        &self,
        access: &mut CvAccess<T>,
        addr: DecoderAddress,
    ) -> Result<ProbeResult, ProbeError> {
        debug!("probing decoder {} for its manufacturer", addr);
        let manufacturer_id = access.read_cv(addr, CvNumber::CV8)?;

        let vendor = Vendor::from_manufacturer_id(manufacturer_id)
            .ok_or(ProbeError::UnknownManufacturer { id: manufacturer_id })?;

        let layout = match vendor {
            Vendor::Esu => DecoderLayout::esu(self.config.esu_lines).ok_or(
                ProbeError::UnsupportedTableSize {
                    lines: self.config.esu_lines,
                },
            )?,
            Vendor::Lenz => DecoderLayout::Lenz,
            Vendor::Zimo => DecoderLayout::Zimo,
            Vendor::Tams => {
                let cv96 = access.read_cv(addr, CvNumber::CV96)?;
                debug!("TAMS decoder {} reports CV96 = {}", addr, cv96);
                DecoderLayout::tams_for_mode(cv96)
                    .ok_or(ProbeError::UnsupportedCapability { cv96 })?
            }
        };

        info!(
            "identified {} decoder at address {} ({} mapping lines)",
            vendor.name(),
            addr,
            layout.lines()
        );
        Ok(ProbeResult {
            vendor,
            manufacturer_id,
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dcc_cv::ProgrammingPage;
    use dcc_sim::VirtualDecoder;

    fn addr() -> DecoderAddress {
        DecoderAddress::new(3).unwrap()
    }

    fn probe_decoder(decoder: VirtualDecoder) -> Result<ProbeResult, ProbeError> {
        let mut access = CvAccess::new(decoder);
        LayoutProber::new().probe(&mut access, addr())
    }

    #[test]
    fn test_probe_esu_defaults_to_full_table() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 151);

        let result = probe_decoder(decoder).unwrap();
        assert_eq!(result.vendor, Vendor::Esu);
        assert_eq!(result.manufacturer_id, 151);
        assert_eq!(result.layout, DecoderLayout::Esu { lines: 72 });
    }

    #[test]
    fn test_probe_esu_respects_configured_table() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 151);
        let mut access = CvAccess::new(decoder);

        let prober = LayoutProber::with_config(ProbeConfig { esu_lines: 16 });
        let result = prober.probe(&mut access, addr()).unwrap();
        assert_eq!(result.layout, DecoderLayout::Esu { lines: 16 });
    }

    #[test]
    fn test_probe_rejects_bad_esu_config() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 151);
        let mut access = CvAccess::new(decoder);

        let prober = LayoutProber::with_config(ProbeConfig { esu_lines: 20 });
        assert_eq!(
            prober.probe(&mut access, addr()),
            Err(ProbeError::UnsupportedTableSize { lines: 20 })
        );
    }

    #[test]
    fn test_probe_lenz_and_zimo() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 99);
        assert_eq!(probe_decoder(decoder).unwrap().layout, DecoderLayout::Lenz);

        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 145);
        assert_eq!(probe_decoder(decoder).unwrap().layout, DecoderLayout::Zimo);
    }

    #[test]
    fn test_probe_tams_reads_cv96() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 62);
        decoder.set_cv(96, 2);
        assert_eq!(
            probe_decoder(decoder).unwrap().layout,
            DecoderLayout::Tams { index_page: 40 }
        );

        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 62);
        decoder.set_cv(96, 4);
        assert_eq!(
            probe_decoder(decoder).unwrap().layout,
            DecoderLayout::Tams { index_page: 42 }
        );
    }

    #[test]
    fn test_probe_tams_rejects_unknown_mode() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 62);
        decoder.set_cv(96, 7);

        assert_eq!(
            probe_decoder(decoder),
            Err(ProbeError::UnsupportedCapability { cv96: 7 })
        );
    }

    #[test]
    fn test_probe_unknown_manufacturer() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 33);

        assert_eq!(
            probe_decoder(decoder),
            Err(ProbeError::UnknownManufacturer { id: 33 })
        );
    }

    #[test]
    fn test_probe_failure_stops_after_first_read() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 62);
        decoder.set_cv(96, 2);
        decoder.fail_next_reads(u32::MAX);
        let mut access = CvAccess::new(decoder);

        let err = LayoutProber::new().probe(&mut access, addr()).unwrap_err();
        assert!(matches!(err, ProbeError::Read(_)));
        // Only the CV8 attempts went out; CV96 was never tried.
        let log = access.transport().log();
        assert!(log.iter().all(|op| matches!(
            op,
            dcc_sim::TransportOp::ReadCv { cv: 8, .. }
        )));
    }

    #[test]
    fn test_probe_result_page_matches_mode() {
        let mut decoder = VirtualDecoder::new(3);
        decoder.set_cv(8, 62);
        decoder.set_cv(96, 2);

        let result = probe_decoder(decoder).unwrap();
        let cell = result.layout.read_cell(0, 0).unwrap();
        assert_eq!(cell.page, Some(ProgrammingPage::new(0, 40)));
    }
}
