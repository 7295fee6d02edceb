//! Retrying CV access on top of a one-shot transport
//!
//! Wraps a [`CvTransport`] with bounded retries, verification policies,
//! CV31/CV32 page writing and XPOM block reads. A call either returns a
//! definite value or a typed error; a failed read is never silently
//! treated as CV = 0.

use tracing::{debug, trace, warn};

use crate::error::{ReadError, WriteError};
use crate::transport::CvTransport;
use crate::types::{
    CvNumber, DecoderAddress, ProgrammingPage, ReadStatistics, RetryBudgets, VerifyPolicy,
};

/// Retrying, instrumented CV access for one programming session
pub struct CvAccess<T: CvTransport> {
    transport: T,
    budgets: RetryBudgets,
    stats: ReadStatistics,
}

impl<T: CvTransport> CvAccess<T> {
    /// Wrap a transport with default retry budgets
    pub fn new(transport: T) -> Self {
        Self::with_budgets(transport, RetryBudgets::default())
    }

    /// Wrap a transport with explicit retry budgets
    pub fn with_budgets(transport: T, budgets: RetryBudgets) -> Self {
        Self {
            transport,
            budgets,
            stats: ReadStatistics::default(),
        }
    }

    /// Get the configured retry budgets
    pub fn budgets(&self) -> RetryBudgets {
        self.budgets
    }

    /// Get the advisory counters accumulated so far
    pub fn stats(&self) -> ReadStatistics {
        self.stats
    }

    /// Reset the advisory counters (done at the start of each pass)
    pub fn reset_counters(&mut self) {
        self.stats = ReadStatistics::default();
    }

    /// Borrow the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Unwrap the underlying transport
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Read one CV, retrying up to the single-CV budget
    ///
    /// Returns the first successfully decoded value. No partial or
    /// ambiguous result is ever returned.
    pub fn read_cv(&mut self, addr: DecoderAddress, cv: CvNumber) -> Result<u8, ReadError> {
        for attempt in 1..=self.budgets.single_cv {
            self.stats.reads += 1;
            if let Some(value) = self.transport.read_cv(addr, cv) {
                trace!("{} of decoder {} read as {} (attempt {})", cv, addr, value, attempt);
                return Ok(value);
            }
            self.stats.retries += 1;
            trace!(
                "{} of decoder {}: no feedback on attempt {}/{}",
                cv, addr, attempt, self.budgets.single_cv
            );
        }
        warn!(
            "{} of decoder {}: read budget of {} exhausted",
            cv, addr, self.budgets.single_cv
        );
        Err(ReadError::Exhausted {
            attempts: self.budgets.single_cv,
        })
    }

    /// Write one CV under the given verification policy
    ///
    /// With a verify-before policy the write is skipped entirely (and
    /// reported as success) when the decoder already holds the target
    /// value; writing an already-correct CV is a no-op on real hardware
    /// and only adds bus traffic.
    pub fn write_cv(
        &mut self,
        addr: DecoderAddress,
        cv: CvNumber,
        value: u8,
        policy: VerifyPolicy,
    ) -> Result<(), WriteError> {
        if policy.reads_before() {
            if let Ok(current) = self.read_cv(addr, cv) {
                if current == value {
                    debug!("{} of decoder {} already {}, skipping write", cv, addr, value);
                    return Ok(());
                }
            }
        }

        self.transmit_write(addr, cv, value)?;

        if policy.reads_after() {
            match self.read_cv(addr, cv) {
                Ok(read_back) if read_back == value => {}
                Ok(read_back) => {
                    warn!(
                        "{} of decoder {} read back as {} after writing {}",
                        cv, addr, read_back, value
                    );
                    return Err(WriteError::VerificationFailed {
                        cv: cv.get(),
                        expected: value,
                        read_back: Some(read_back),
                    });
                }
                Err(_) => {
                    return Err(WriteError::VerificationFailed {
                        cv: cv.get(),
                        expected: value,
                        read_back: None,
                    });
                }
            }
        }

        Ok(())
    }

    /// Write the CV31/CV32 programming page, each half under `VerifyBoth`
    ///
    /// CV32 is not attempted when CV31 fails. Must succeed before any
    /// access to CV >= 256 or any XPOM transaction outside the current
    /// page.
    pub fn write_cv_index(
        &mut self,
        addr: DecoderAddress,
        page: ProgrammingPage,
    ) -> Result<(), WriteError> {
        debug!("selecting programming page {} on decoder {}", page, addr);
        self.write_cv(addr, CvNumber::CV31, page.cv31, VerifyPolicy::VerifyBoth)
            .map_err(|source| WriteError::PageWriteFailed {
                cv: CvNumber::CV31.get(),
                source: Box::new(source),
            })?;
        self.write_cv(addr, CvNumber::CV32, page.cv32, VerifyPolicy::VerifyBoth)
            .map_err(|source| WriteError::PageWriteFailed {
                cv: CvNumber::CV32.get(),
                source: Box::new(source),
            })
    }

    /// Read a block of `quads` quads (4 bytes each) in one XPOM transaction
    ///
    /// The block is retried as a whole up to the XPOM budget; a failure on
    /// any sub-read voids the entire attempt.
    pub fn xpom_read_block(
        &mut self,
        addr: DecoderAddress,
        quads: u8,
        page: ProgrammingPage,
        offset: u16,
    ) -> Result<Vec<u8>, ReadError> {
        if quads == 0 || quads > 4 {
            return Err(ReadError::InvalidBlockLength { quads });
        }
        let expected_len = 4 * quads as usize;

        for attempt in 1..=self.budgets.xpom_block {
            self.stats.reads += 1;
            match self.transport.xpom_read(addr, quads, page, offset) {
                Some(bytes) if bytes.len() == expected_len => {
                    trace!(
                        "XPOM block {}+{} of decoder {}: {} bytes (attempt {})",
                        page, offset, addr, expected_len, attempt
                    );
                    return Ok(bytes);
                }
                Some(bytes) => {
                    self.stats.retries += 1;
                    trace!(
                        "XPOM block {}+{} of decoder {}: short frame of {} bytes, discarding",
                        page, offset, addr, bytes.len()
                    );
                }
                None => {
                    self.stats.retries += 1;
                    trace!(
                        "XPOM block {}+{} of decoder {}: no feedback on attempt {}/{}",
                        page, offset, addr, attempt, self.budgets.xpom_block
                    );
                }
            }
        }
        warn!(
            "XPOM block {}+{} of decoder {}: budget of {} exhausted",
            page, offset, addr, self.budgets.xpom_block
        );
        Err(ReadError::Exhausted {
            attempts: self.budgets.xpom_block,
        })
    }

    fn transmit_write(
        &mut self,
        addr: DecoderAddress,
        cv: CvNumber,
        value: u8,
    ) -> Result<(), WriteError> {
        for attempt in 1..=self.budgets.single_cv {
            if self.transport.write_cv(addr, cv, value) {
                trace!("{} of decoder {} written to {} (attempt {})", cv, addr, value, attempt);
                return Ok(());
            }
            self.stats.retries += 1;
            trace!(
                "{} of decoder {}: write not acknowledged on attempt {}/{}",
                cv, addr, attempt, self.budgets.single_cv
            );
        }
        warn!(
            "{} of decoder {}: write budget of {} exhausted",
            cv, addr, self.budgets.single_cv
        );
        Err(WriteError::Exhausted {
            attempts: self.budgets.single_cv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Transport whose reads/writes fail a scripted number of times
    /// before succeeding, with per-call counters.
    struct Scripted {
        cv_value: u8,
        read_failures: u32,
        write_failures: u32,
        xpom_failures: u32,
        reads: u32,
        writes: u32,
        xpoms: u32,
    }

    impl Scripted {
        fn new(cv_value: u8) -> Self {
            Self {
                cv_value,
                read_failures: 0,
                write_failures: 0,
                xpom_failures: 0,
                reads: 0,
                writes: 0,
                xpoms: 0,
            }
        }
    }

    impl CvTransport for Scripted {
        fn read_cv(&mut self, _addr: DecoderAddress, _cv: CvNumber) -> Option<u8> {
            self.reads += 1;
            if self.read_failures > 0 {
                self.read_failures -= 1;
                return None;
            }
            Some(self.cv_value)
        }

        fn write_cv(&mut self, _addr: DecoderAddress, _cv: CvNumber, value: u8) -> bool {
            self.writes += 1;
            if self.write_failures > 0 {
                self.write_failures -= 1;
                return false;
            }
            self.cv_value = value;
            true
        }

        fn xpom_read(
            &mut self,
            _addr: DecoderAddress,
            quads: u8,
            _page: ProgrammingPage,
            _offset: u16,
        ) -> Option<Vec<u8>> {
            self.xpoms += 1;
            if self.xpom_failures > 0 {
                self.xpom_failures -= 1;
                return None;
            }
            Some(vec![self.cv_value; 4 * quads as usize])
        }
    }

    fn addr() -> DecoderAddress {
        DecoderAddress::new(3).unwrap()
    }

    fn cv(n: u16) -> CvNumber {
        CvNumber::new(n).unwrap()
    }

    #[test]
    fn test_read_succeeds_after_k_failures() {
        let mut transport = Scripted::new(42);
        transport.read_failures = 4;
        let mut access = CvAccess::new(transport);

        assert_eq!(access.read_cv(addr(), cv(17)).unwrap(), 42);
        assert_eq!(access.stats().reads, 5);
        assert_eq!(access.stats().retries, 4);
        assert_eq!(access.transport().reads, 5);
    }

    #[test]
    fn test_read_exhausts_budget() {
        let mut transport = Scripted::new(42);
        transport.read_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        assert_eq!(
            access.read_cv(addr(), cv(17)),
            Err(ReadError::Exhausted { attempts: 10 })
        );
        // Never more transport calls than the budget allows.
        assert_eq!(access.transport().reads, 10);
        assert_eq!(access.stats().retries, 10);
    }

    #[test]
    fn test_write_succeeds_after_k_failures() {
        let mut transport = Scripted::new(0);
        transport.write_failures = 3;
        let mut access = CvAccess::new(transport);

        access.write_cv(addr(), cv(5), 9, VerifyPolicy::None).unwrap();
        assert_eq!(access.stats().retries, 3);
        assert_eq!(access.transport().writes, 4);
        assert_eq!(access.transport().cv_value, 9);
    }

    #[test]
    fn test_write_exhausts_budget() {
        let mut transport = Scripted::new(0);
        transport.write_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        assert_eq!(
            access.write_cv(addr(), cv(5), 9, VerifyPolicy::None),
            Err(WriteError::Exhausted { attempts: 10 })
        );
        assert_eq!(access.transport().writes, 10);
    }

    #[test]
    fn test_verify_before_skips_redundant_write() {
        let mut access = CvAccess::new(Scripted::new(9));

        access
            .write_cv(addr(), cv(5), 9, VerifyPolicy::VerifyBeforeWrite)
            .unwrap();
        // The CV already held the target value: zero transmissions.
        assert_eq!(access.transport().writes, 0);
        assert_eq!(access.transport().reads, 1);
    }

    #[test]
    fn test_verify_before_transmits_on_mismatch() {
        let mut access = CvAccess::new(Scripted::new(1));

        access
            .write_cv(addr(), cv(5), 9, VerifyPolicy::VerifyBeforeWrite)
            .unwrap();
        assert_eq!(access.transport().writes, 1);
        assert_eq!(access.transport().cv_value, 9);
    }

    #[test]
    fn test_verify_before_read_failure_still_writes() {
        let mut transport = Scripted::new(9);
        transport.read_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        // An inconclusive pre-read must fall through to an unconditional
        // write, not suppress it.
        access
            .write_cv(addr(), cv(5), 9, VerifyPolicy::VerifyBeforeWrite)
            .unwrap();
        assert_eq!(access.transport().writes, 1);
    }

    /// Transport that accepts writes but reads back a fixed wrong value.
    struct StuckReads(u8);

    impl CvTransport for StuckReads {
        fn read_cv(&mut self, _addr: DecoderAddress, _cv: CvNumber) -> Option<u8> {
            Some(self.0)
        }

        fn write_cv(&mut self, _addr: DecoderAddress, _cv: CvNumber, _value: u8) -> bool {
            true
        }

        fn xpom_read(
            &mut self,
            _addr: DecoderAddress,
            _quads: u8,
            _page: ProgrammingPage,
            _offset: u16,
        ) -> Option<Vec<u8>> {
            None
        }
    }

    #[test]
    fn test_verify_after_reports_mismatch() {
        let mut access = CvAccess::new(StuckReads(3));

        assert_eq!(
            access.write_cv(addr(), cv(5), 9, VerifyPolicy::VerifyAfterWrite),
            Err(WriteError::VerificationFailed {
                cv: 5,
                expected: 9,
                read_back: Some(3),
            })
        );
    }

    #[test]
    fn test_verify_after_reports_unreadable_read_back() {
        let mut transport = Scripted::new(0);
        // Write lands, then every read-back attempt fails.
        transport.read_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        assert_eq!(
            access.write_cv(addr(), cv(5), 9, VerifyPolicy::VerifyAfterWrite),
            Err(WriteError::VerificationFailed {
                cv: 5,
                expected: 9,
                read_back: None,
            })
        );
    }

    #[test]
    fn test_page_write_short_circuits_on_cv31_failure() {
        let mut transport = Scripted::new(0);
        transport.read_failures = u32::MAX;
        transport.write_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        let err = access
            .write_cv_index(addr(), ProgrammingPage::new(16, 3))
            .unwrap_err();
        match err {
            WriteError::PageWriteFailed { cv, .. } => assert_eq!(cv, 31),
            other => panic!("unexpected error: {other:?}"),
        }
        // CV32 was never attempted: 10 failed transmissions, all for CV31.
        assert_eq!(access.transport().writes, 10);
    }

    #[test]
    fn test_xpom_block_retried_as_a_whole() {
        let mut transport = Scripted::new(7);
        transport.xpom_failures = 6;
        let mut access = CvAccess::new(transport);

        let block = access
            .xpom_read_block(addr(), 4, ProgrammingPage::new(16, 3), 0)
            .unwrap();
        assert_eq!(block, vec![7; 16]);
        assert_eq!(access.transport().xpoms, 7);
        assert_eq!(access.stats().retries, 6);
    }

    #[test]
    fn test_xpom_block_uses_larger_budget() {
        let mut transport = Scripted::new(7);
        transport.xpom_failures = u32::MAX;
        let mut access = CvAccess::new(transport);

        assert_eq!(
            access.xpom_read_block(addr(), 2, ProgrammingPage::new(16, 3), 0),
            Err(ReadError::Exhausted { attempts: 20 })
        );
        assert_eq!(access.transport().xpoms, 20);
    }

    #[test]
    fn test_xpom_block_size_validated() {
        let mut access = CvAccess::new(Scripted::new(0));

        assert_eq!(
            access.xpom_read_block(addr(), 0, ProgrammingPage::new(0, 0), 0),
            Err(ReadError::InvalidBlockLength { quads: 0 })
        );
        assert_eq!(
            access.xpom_read_block(addr(), 5, ProgrammingPage::new(0, 0), 0),
            Err(ReadError::InvalidBlockLength { quads: 5 })
        );
        assert_eq!(access.transport().xpoms, 0);
    }

    #[test]
    fn test_reset_counters() {
        let mut transport = Scripted::new(1);
        transport.read_failures = 2;
        let mut access = CvAccess::new(transport);

        access.read_cv(addr(), cv(8)).unwrap();
        assert_ne!(access.stats(), ReadStatistics::default());

        access.reset_counters();
        assert_eq!(access.stats(), ReadStatistics::default());
    }
}
