//! Per-pass outcome counters.

use std::time::Duration;

use crate::download::Outcome;

/// What happened during one traversal pass.
#[derive(Debug, Clone, Default)]
pub struct PassStats {
    /// Files written to disk (including ones with a length mismatch).
    pub files_downloaded: usize,
    /// Files already complete on disk.
    pub files_skipped: usize,
    /// Asset GETs that answered with a non-success status.
    pub files_failed: usize,
    /// Items with no usable resource descriptor.
    pub files_unresolved: usize,
    /// Downloads whose byte count did not match the advertised length.
    pub length_mismatches: usize,
    /// Total bytes written.
    pub total_bytes: u64,
    /// Wall-clock duration of the pass.
    pub elapsed: Duration,
}

impl PassStats {
    /// Creates empty counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one download outcome into the counters.
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Downloaded { bytes } => {
                self.files_downloaded += 1;
                self.total_bytes += bytes;
            }
            Outcome::LengthMismatch { written, .. } => {
                self.files_downloaded += 1;
                self.length_mismatches += 1;
                self.total_bytes += written;
            }
            Outcome::Skipped => self.files_skipped += 1,
            Outcome::Failed { .. } => self.files_failed += 1,
        }
    }

    /// Counts an item the resolver produced no candidate for.
    pub const fn record_unresolved(&mut self) {
        self.files_unresolved += 1;
    }

    /// True when the pass moved no bytes and hit no problems.
    #[must_use]
    pub const fn is_quiet(&self) -> bool {
        self.files_downloaded == 0
            && self.files_failed == 0
            && self.files_unresolved == 0
            && self.length_mismatches == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn record_counts_each_outcome() {
        let mut stats = PassStats::new();
        stats.record(&Outcome::Downloaded { bytes: 100 });
        stats.record(&Outcome::Skipped);
        stats.record(&Outcome::LengthMismatch {
            advertised: 1000,
            written: 900,
        });
        stats.record(&Outcome::Failed {
            status: StatusCode::NOT_FOUND,
        });
        stats.record_unresolved();

        assert_eq!(stats.files_downloaded, 2);
        assert_eq!(stats.files_skipped, 1);
        assert_eq!(stats.files_failed, 1);
        assert_eq!(stats.files_unresolved, 1);
        assert_eq!(stats.length_mismatches, 1);
        assert_eq!(stats.total_bytes, 1000);
        assert!(!stats.is_quiet());
    }

    #[test]
    fn skips_alone_are_quiet() {
        let mut stats = PassStats::new();
        stats.record(&Outcome::Skipped);
        stats.record(&Outcome::Skipped);
        assert!(stats.is_quiet());
    }
}
