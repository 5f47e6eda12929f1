// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `test-impact` failures.
///
/// `test-impact run` normally exits with the status code of the test engine it drives (see
/// [`PytestExitCode`]). The codes here are produced by the harness itself, before or after the
/// engine runs, and never overlap with the engine's range.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ImpactExitCode {}

impl ImpactExitCode {
    /// No errors occurred and test-impact exited normally.
    pub const OK: i32 = 0;

    /// The selection input could not be parsed.
    ///
    /// This is reported before the test engine is contacted.
    pub const INVALID_SELECTION: i32 = 94;

    /// A user issue happened while setting up a test-impact invocation.
    pub const SETUP_ERROR: i32 = 96;

    /// The test engine could not be set up or spawned, or was terminated by a signal.
    pub const ENGINE_EXEC_FAILED: i32 = 102;

    /// Exporting or reading per-test coverage data produced an error.
    pub const COVERAGE_FAILED: i32 = 103;

    /// Creating a test list produced an error.
    pub const TEST_LIST_CREATION_FAILED: i32 = 104;

    /// The structured results produced by the test engine could not be read.
    pub const RESULTS_READ_FAILED: i32 = 105;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}

/// Exit codes produced by pytest, the test engine driven by `test-impact`.
///
/// `test-impact run` passes these through unchanged, except that [`Self::TESTS_FAILED`] becomes
/// [`Self::OK`] when every failure belongs to a test that was expected to fail.
pub enum PytestExitCode {}

impl PytestExitCode {
    /// All selected tests passed, or were appropriately downgraded.
    pub const OK: i32 = 0;

    /// Some tests were collected and run but failed.
    pub const TESTS_FAILED: i32 = 1;

    /// Test execution was interrupted, for example by a collection error.
    pub const INTERRUPTED: i32 = 2;

    /// An internal error happened while executing tests.
    pub const INTERNAL_ERROR: i32 = 3;

    /// pytest was misused, for example with an unknown command-line option.
    pub const USAGE_ERROR: i32 = 4;

    /// No tests were collected.
    pub const NO_TESTS_COLLECTED: i32 = 5;

    /// Returns true if `code` is within the range pytest documents.
    pub fn is_engine_code(code: i32) -> bool {
        (Self::OK..=Self::NO_TESTS_COLLECTED).contains(&code)
    }
}
