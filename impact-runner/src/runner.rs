// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test runner.
//!
//! The main structure in this module is [`ImpactRunner`].

use crate::{
    aggregator::aggregate,
    config::ImpactConfig,
    coverage::{CoverageData, CoverageSession},
    engine::{EngineRun, TestEngine},
    errors::{CreateTestListError, RunError, WriteEventError},
    list::TestList,
    outcome::{PhaseDurations, RawOutcome, TestStatus},
    reducer::ContextReducer,
    reporter::TestEvent,
    selection::SelectionPolicy,
    stopwatch::StopwatchStart,
};
use impact_metadata::{PytestExitCode, RunSummary, TestId, TestResultRecord};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Runs a test suite through an engine, applying a selection policy and recording per-test
/// scopes.
#[derive(Debug)]
pub struct ImpactRunner<'a, E: ?Sized> {
    engine: &'a E,
    policy: &'a SelectionPolicy,
    config: &'a ImpactConfig,
}

impl<'a, E: TestEngine + ?Sized> ImpactRunner<'a, E> {
    /// Creates a new runner.
    ///
    /// The repository root in `config` must be canonical.
    pub fn new(engine: &'a E, policy: &'a SelectionPolicy, config: &'a ImpactConfig) -> Self {
        Self {
            engine,
            policy,
            config,
        }
    }

    /// Collects and runs tests, calling `callback` with progress events.
    ///
    /// If the callback returns an error, the run stops and the error is returned.
    pub fn execute<F>(&self, mut callback: F) -> Result<ImpactRun, RunError>
    where
        F: FnMut(TestEvent<'_>) -> Result<(), WriteEventError>,
    {
        let stopwatch = StopwatchStart::now();

        let collected = self.engine.collect()?;
        if collected.status_code != PytestExitCode::OK {
            callback(TestEvent::CollectionFailed {
                status_code: collected.status_code,
            })?;
            return Ok(ImpactRun {
                status_code: collected.status_code,
                outcomes: Vec::new(),
                records: Vec::new(),
                stats: RunStats::default(),
            });
        }

        if collected.test_ids.is_empty() {
            return Err(CreateTestListError::EmptyTestList.into());
        }

        let test_list = TestList::new(collected.test_ids, self.policy);
        for id in self.policy.unmatched(&test_list) {
            debug!("selection input names `{id}`, which wasn't collected");
        }
        callback(TestEvent::RunStarted {
            test_list: &test_list,
        })?;

        let engine_run = if test_list.run_count() == 0 {
            info!("every collected test is skipped, not running the test engine");
            EngineRun::default()
        } else {
            let session = CoverageSession::start(self.config.coverage(), self.config.repo_root())?;
            self.engine.execute(&test_list, session)?
        };
        let EngineRun {
            status_code: engine_status,
            outcomes: engine_outcomes,
            coverage,
        } = engine_run;

        let MergedOutcomes {
            outcomes,
            downgraded,
            missing,
        } = merge_outcomes(&test_list, engine_outcomes);
        for id in &missing {
            warn!("test `{id}` was run, but the engine didn't report a result for it");
        }
        let status_code = reconcile_status(engine_status, &outcomes, downgraded);
        if status_code != engine_status {
            debug!(
                "every failure was expected, exiting with status {status_code} \
                 instead of {engine_status}"
            );
        }

        for outcome in &outcomes {
            callback(TestEvent::TestFinished {
                outcome,
                directive: test_list.directive_for(outcome.id.as_str()),
            })?;
        }

        let records = self.build_records(&outcomes, &coverage);
        let stats = RunStats::new(&test_list, &outcomes);
        callback(TestEvent::RunFinished {
            elapsed: stopwatch.end().duration,
            run_stats: &stats,
            status_code,
        })?;

        Ok(ImpactRun {
            status_code,
            outcomes,
            records,
            stats,
        })
    }

    fn build_records(
        &self,
        outcomes: &[RawOutcome],
        coverage: &CoverageData,
    ) -> Vec<TestResultRecord> {
        let reducer = ContextReducer::new(
            self.config.repo_root(),
            &self.config.coverage().context_separator,
        );
        let scopes = reducer.reduce(coverage);
        debug!("recorded scopes for {} tests", scopes.len());
        aggregate(outcomes, &scopes)
    }
}

/// The result of [`ImpactRunner::execute`].
#[derive(Clone, Debug)]
pub struct ImpactRun {
    /// The status code to exit with.
    pub status_code: i32,

    /// Outcomes for every test, with selection directives applied.
    pub outcomes: Vec<RawOutcome>,

    /// One record per test that ran to a final result.
    pub records: Vec<TestResultRecord>,

    /// Statistics for the run.
    pub stats: RunStats,
}

impl ImpactRun {
    /// Returns the machine-readable summary of this run.
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            status_code: self.status_code,
            tests: self.records.clone(),
        }
    }
}

/// Statistics for an impact run.
#[derive(Clone, Default, Debug, PartialEq)]
pub struct RunStats {
    /// The number of tests collected.
    pub collected: usize,

    /// The number of tests passed to the engine.
    pub initial_run_count: usize,

    /// The number of tests the engine reported results for.
    pub finished_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed, or errored during setup or teardown.
    pub failed: usize,

    /// The number of tests that failed as expected.
    pub expected_failures: usize,

    /// The number of tests that passed despite being marked as expected to fail by the engine.
    pub unexpected_passes: usize,

    /// The number of tests that were skipped, by selection or by the engine.
    pub skipped: usize,

    /// The number of tests with an unrecognized status, or no result from the engine.
    pub unknown: usize,

    /// The slowest test that ran, and its duration in milliseconds.
    pub slowest: Option<(TestId, f64)>,
}

impl RunStats {
    pub(crate) fn new(test_list: &TestList, outcomes: &[RawOutcome]) -> Self {
        let mut stats = Self {
            collected: test_list.test_count(),
            initial_run_count: test_list.run_count(),
            ..Self::default()
        };

        for outcome in outcomes {
            match outcome.status {
                TestStatus::Passed => stats.passed += 1,
                TestStatus::Failed | TestStatus::Error => stats.failed += 1,
                TestStatus::XFailed => stats.expected_failures += 1,
                TestStatus::XPassed => stats.unexpected_passes += 1,
                TestStatus::Skipped => stats.skipped += 1,
                TestStatus::Unknown => stats.unknown += 1,
            }

            if test_list.directive_for(outcome.id.as_str()).is_executed() {
                stats.finished_count += 1;
                if outcome.status != TestStatus::Skipped {
                    let time_ms = outcome.durations.total_ms();
                    if stats
                        .slowest
                        .as_ref()
                        .is_none_or(|(_, slowest_ms)| time_ms > *slowest_ms)
                    {
                        stats.slowest = Some((outcome.id.clone(), time_ms));
                    }
                }
            }
        }

        stats
    }

    /// Returns true if any tests failed, or have no known result.
    pub fn any_failed(&self) -> bool {
        self.failed > 0 || self.unknown > 0
    }
}

/// The result of [`merge_outcomes`].
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct MergedOutcomes {
    /// Outcomes in collection order, followed by outcomes for tests that weren't collected.
    pub(crate) outcomes: Vec<RawOutcome>,

    /// The number of failures turned into expected failures by a selection directive.
    pub(crate) downgraded: usize,

    /// Tests that were run, but that the engine reported no result for.
    pub(crate) missing: Vec<TestId>,
}

/// Combines engine outcomes with synthesized outcomes for skipped tests.
///
/// The result is in collection order. Engine outcomes for tests that weren't collected (for
/// example, tests generated during the run) follow in report order.
///
/// If the engine reported results, every test that was run and has no result of its own gets an
/// [`Unknown`](TestStatus::Unknown) outcome. If it reported none at all, as happens when its report
/// is missing, no outcomes are synthesized for run tests.
pub(crate) fn merge_outcomes(
    test_list: &TestList,
    engine_outcomes: Vec<RawOutcome>,
) -> MergedOutcomes {
    let report_present = !engine_outcomes.is_empty();
    let mut downgraded = 0;
    let mut by_id: HashMap<TestId, RawOutcome> = HashMap::with_capacity(engine_outcomes.len());
    let mut uncollected = Vec::new();
    for mut outcome in engine_outcomes {
        let Some(info) = test_list.get(outcome.id.as_str()) else {
            uncollected.push(outcome);
            continue;
        };
        let status = info.directive.apply(outcome.status);
        if info.directive.is_executed() && status != outcome.status {
            downgraded += 1;
        }
        outcome.status = status;
        by_id.insert(outcome.id.clone(), outcome);
    }

    let mut merged = Vec::with_capacity(test_list.test_count() + uncollected.len());
    let mut missing = Vec::new();
    for test in test_list.iter_tests() {
        if !test.info.directive.is_executed() {
            merged.push(RawOutcome::skipped(test.id.clone()));
        } else if let Some(outcome) = by_id.remove(test.id.as_str()) {
            merged.push(outcome);
        } else if report_present {
            missing.push(test.id.clone());
            merged.push(RawOutcome::new(
                test.id.clone(),
                TestStatus::Unknown,
                PhaseDurations::default(),
            ));
        }
    }
    merged.extend(uncollected);

    MergedOutcomes {
        outcomes: merged,
        downgraded,
        missing,
    }
}

/// Reconciles the engine's status with the outcomes after selection directives were applied.
///
/// A "tests failed" status becomes OK only if at least one failure was turned into an expected
/// failure, and no outcome remains that failed or has no known result. Every other status is
/// passed through unchanged.
pub(crate) fn reconcile_status(
    engine_status: i32,
    outcomes: &[RawOutcome],
    downgraded: usize,
) -> i32 {
    let unresolved = outcomes
        .iter()
        .any(|outcome| outcome.status.is_failure() || outcome.status == TestStatus::Unknown);
    if engine_status == PytestExitCode::TESTS_FAILED && downgraded > 0 && !unresolved {
        PytestExitCode::OK
    } else {
        engine_status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn outcome(id: &str, status: TestStatus) -> RawOutcome {
        RawOutcome::new(id, status, PhaseDurations::default())
    }

    fn sample_list() -> TestList {
        let policy = SelectionPolicy::from_previous([("t::skip", true), ("t::flaky", false)]);
        TestList::new(
            ["t::first", "t::skip", "t::flaky", "t::last"].map(TestId::new),
            &policy,
        )
    }

    #[test]
    fn merge_in_collection_order() {
        let merged = merge_outcomes(
            &sample_list(),
            vec![
                outcome("t::last", TestStatus::Passed),
                outcome("t::generated", TestStatus::Passed),
                outcome("t::flaky", TestStatus::Failed),
                outcome("t::first", TestStatus::Failed),
            ],
        );

        assert_eq!(
            merged,
            MergedOutcomes {
                outcomes: vec![
                    outcome("t::first", TestStatus::Failed),
                    outcome("t::skip", TestStatus::Skipped),
                    outcome("t::flaky", TestStatus::XFailed),
                    outcome("t::last", TestStatus::Passed),
                    outcome("t::generated", TestStatus::Passed),
                ],
                downgraded: 1,
                missing: Vec::new(),
            }
        );
    }

    #[test]
    fn missing_results_are_unknown() {
        let merged = merge_outcomes(&sample_list(), vec![outcome("t::first", TestStatus::Passed)]);

        assert_eq!(
            merged,
            MergedOutcomes {
                outcomes: vec![
                    outcome("t::first", TestStatus::Passed),
                    outcome("t::skip", TestStatus::Skipped),
                    outcome("t::flaky", TestStatus::Unknown),
                    outcome("t::last", TestStatus::Unknown),
                ],
                downgraded: 0,
                missing: vec![TestId::new("t::flaky"), TestId::new("t::last")],
            }
        );
    }

    #[test]
    fn no_report_synthesizes_only_skips() {
        let merged = merge_outcomes(&sample_list(), Vec::new());
        assert_eq!(
            merged.outcomes,
            vec![outcome("t::skip", TestStatus::Skipped)]
        );
        assert!(merged.missing.is_empty());
    }

    #[test]
    fn skip_overrides_engine_result() {
        // If the engine ran a skipped test anyway, its outcome is still forced to skipped.
        let merged = merge_outcomes(&sample_list(), vec![outcome("t::skip", TestStatus::Failed)]);
        assert_eq!(merged.outcomes[1], outcome("t::skip", TestStatus::Skipped));
        assert_eq!(merged.downgraded, 0);
    }

    #[test_case(1, &[TestStatus::XFailed, TestStatus::Passed], 1, 0 ; "expected failures only")]
    #[test_case(1, &[TestStatus::XFailed, TestStatus::Failed], 1, 1 ; "real failure remains")]
    #[test_case(1, &[TestStatus::XFailed, TestStatus::Error], 1, 1 ; "error remains")]
    #[test_case(1, &[TestStatus::XFailed, TestStatus::Unknown], 1, 1 ; "missing result remains")]
    #[test_case(1, &[], 0, 1 ; "no outcomes")]
    #[test_case(1, &[TestStatus::XFailed, TestStatus::XPassed], 0, 1 ; "engine expected failures only")]
    #[test_case(0, &[TestStatus::Passed], 0, 0 ; "ok passes through")]
    #[test_case(2, &[], 0, 2 ; "interrupted passes through")]
    #[test_case(4, &[], 0, 4 ; "usage error passes through")]
    #[test_case(3, &[TestStatus::XFailed], 1, 3 ; "internal error passes through")]
    fn status_reconciliation(
        engine_status: i32,
        statuses: &[TestStatus],
        downgraded: usize,
        expected: i32,
    ) {
        let outcomes: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| outcome(&format!("t::test_{i}"), *status))
            .collect();
        assert_eq!(
            reconcile_status(engine_status, &outcomes, downgraded),
            expected
        );
    }

    #[test]
    fn stats() {
        let test_list = sample_list();
        let outcomes = vec![
            RawOutcome::new(
                "t::first",
                TestStatus::Failed,
                PhaseDurations {
                    call: Some(0.2),
                    ..PhaseDurations::default()
                },
            ),
            outcome("t::skip", TestStatus::Skipped),
            RawOutcome::new(
                "t::flaky",
                TestStatus::XFailed,
                PhaseDurations {
                    call: Some(0.5),
                    ..PhaseDurations::default()
                },
            ),
            outcome("t::last", TestStatus::Passed),
        ];

        let stats = RunStats::new(&test_list, &outcomes);
        assert_eq!(
            stats,
            RunStats {
                collected: 4,
                initial_run_count: 3,
                finished_count: 3,
                passed: 1,
                failed: 1,
                expected_failures: 1,
                unexpected_passes: 0,
                skipped: 1,
                unknown: 0,
                slowest: Some((TestId::new("t::flaky"), 500.0)),
            }
        );
        assert!(stats.any_failed());
    }
}
