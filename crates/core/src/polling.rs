//! Client polling cadence and failure tolerance.
//!
//! Generation jobs call an LLM and take minutes; scan extraction is an OCR
//! round trip and finishes in seconds, so it is polled more often.

use std::time::Duration;

use crate::jobs::JobKind;

/// Re-check interval for recommendation and week-generation jobs.
pub const GENERATION_POLL_INTERVAL: Duration = Duration::from_secs(15);

/// Re-check interval for scan-extraction jobs.
pub const SCAN_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Consecutive failed status requests tolerated before a poller gives up.
pub const MAX_CONSECUTIVE_POLL_FAILURES: u32 = 5;

pub fn poll_interval_for(kind: JobKind) -> Duration {
    match kind {
        JobKind::Recommendation | JobKind::WeekGeneration => GENERATION_POLL_INTERVAL,
        JobKind::ScanExtraction => SCAN_POLL_INTERVAL,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_kinds_poll_every_fifteen_seconds() {
        assert_eq!(poll_interval_for(JobKind::Recommendation), Duration::from_secs(15));
        assert_eq!(poll_interval_for(JobKind::WeekGeneration), Duration::from_secs(15));
    }

    #[test]
    fn scan_extraction_polls_every_three_seconds() {
        assert_eq!(JobKind::ScanExtraction.poll_interval(), Duration::from_secs(3));
    }
}
