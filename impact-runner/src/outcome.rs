// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw per-test outcomes, as reported by the test engine.

use impact_metadata::TestId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The status of a single test, as reported by the engine or synthesized by the runner.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,

    /// The test failed, and was expected to.
    XFailed,

    /// The test passed, but was expected to fail.
    XPassed,

    /// An error occurred during setup or teardown of the test.
    Error,

    /// The engine reported a status test-impact doesn't recognize, or no result at all.
    #[serde(other)]
    Unknown,
}

impl TestStatus {
    /// Returns true if the test passed.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Returns true if this status fails the suite.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::Failed | Self::Error)
    }

    /// Returns true if tests with this status don't produce a result record.
    pub fn is_excluded(self) -> bool {
        matches!(self, Self::Skipped | Self::XFailed)
    }

    /// Returns the status as it appears in engine reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
            Self::XFailed => "xfailed",
            Self::XPassed => "xpassed",
            Self::Error => "error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time spent in each phase of a test, in seconds.
///
/// A phase that wasn't reported counts as zero.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PhaseDurations {
    /// Time spent in setup.
    pub setup: Option<f64>,

    /// Time spent in the test body.
    pub call: Option<f64>,

    /// Time spent in teardown.
    pub teardown: Option<f64>,
}

impl PhaseDurations {
    /// Returns the total time across all phases, in seconds.
    pub fn total_secs(&self) -> f64 {
        self.call.unwrap_or(0.0) + self.setup.unwrap_or(0.0) + self.teardown.unwrap_or(0.0)
    }

    /// Returns the total time across all phases, in milliseconds.
    pub fn total_ms(&self) -> f64 {
        self.total_secs() * 1000.0
    }
}

/// The raw outcome of a single test.
#[derive(Clone, Debug, PartialEq)]
pub struct RawOutcome {
    /// The identifier of the test.
    pub id: TestId,

    /// The reported status.
    pub status: TestStatus,

    /// Time spent in each phase.
    pub durations: PhaseDurations,
}

impl RawOutcome {
    /// Creates a new outcome.
    pub fn new(id: impl Into<TestId>, status: TestStatus, durations: PhaseDurations) -> Self {
        Self {
            id: id.into(),
            status,
            durations,
        }
    }

    /// Creates the outcome for a test that was never executed.
    pub fn skipped(id: impl Into<TestId>) -> Self {
        Self::new(id, TestStatus::Skipped, PhaseDurations::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(r#""passed""#, TestStatus::Passed ; "passed")]
    #[test_case(r#""xfailed""#, TestStatus::XFailed ; "xfailed")]
    #[test_case(r#""xpassed""#, TestStatus::XPassed ; "xpassed")]
    #[test_case(r#""error""#, TestStatus::Error ; "error")]
    #[test_case(r#""rerun""#, TestStatus::Unknown ; "unrecognized")]
    fn status_deserialize(input: &str, expected: TestStatus) {
        let status: TestStatus = serde_json::from_str(input).expect("status parses");
        assert_eq!(status, expected);
        if expected != TestStatus::Unknown {
            assert_eq!(format!("\"{status}\""), input, "display matches report text");
        }
    }

    #[test]
    fn missing_phases_count_as_zero() {
        let durations = PhaseDurations {
            setup: Some(0.5),
            call: Some(1.0),
            teardown: None,
        };
        assert_eq!(durations.total_ms(), 1500.0);
        assert_eq!(PhaseDurations::default().total_ms(), 0.0);
    }
}
