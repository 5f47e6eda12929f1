// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test engines that test-impact can drive.
//!
//! An engine discovers tests and runs them with per-test coverage contexts recorded. The only
//! engine shipped with test-impact is [`PytestEngine`].

mod pytest;

pub use pytest::*;

use crate::{
    coverage::{CoverageData, CoverageSession},
    errors::{CreateTestListError, EngineRunError},
    list::TestList,
    outcome::RawOutcome,
};
use impact_metadata::TestId;

/// A test engine.
pub trait TestEngine {
    /// Lists tests in collection order.
    ///
    /// A non-zero status in the result means collection failed. The status is reported unchanged
    /// and no tests are run.
    fn collect(&self) -> Result<CollectedTests, CreateTestListError>;

    /// Runs every test in `test_list` that isn't skipped, recording coverage within `coverage`.
    ///
    /// Outcomes are returned in the order the engine reported them, without any selection
    /// directives applied.
    fn execute(
        &self,
        test_list: &TestList,
        coverage: CoverageSession,
    ) -> Result<EngineRun, EngineRunError>;
}

/// The result of [`TestEngine::collect`].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollectedTests {
    /// The status the collection pass exited with.
    pub status_code: i32,

    /// Collected test identifiers, in collection order.
    pub test_ids: Vec<TestId>,
}

/// The result of [`TestEngine::execute`].
#[derive(Clone, Debug, Default)]
pub struct EngineRun {
    /// The status the engine exited with.
    pub status_code: i32,

    /// Raw outcomes, in the order the engine reported them.
    pub outcomes: Vec<RawOutcome>,

    /// Coverage data recorded during the run.
    pub coverage: CoverageData,
}
