// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Joins raw outcomes with per-test scopes into normalized result records.

use crate::{outcome::RawOutcome, reducer::TestScopes};
use impact_metadata::TestResultRecord;

/// Produces one record per outcome that ran to a final result, preserving input order.
///
/// Skipped tests and expected failures don't produce records.
pub fn aggregate(outcomes: &[RawOutcome], scopes: &TestScopes) -> Vec<TestResultRecord> {
    outcomes
        .iter()
        .filter(|outcome| !outcome.status.is_excluded())
        .map(|outcome| to_record(outcome, scopes))
        .collect()
}

fn to_record(outcome: &RawOutcome, scopes: &TestScopes) -> TestResultRecord {
    let call_graph = scopes
        .get(outcome.id.as_str())
        .map(|scopes| scopes.iter().cloned().collect())
        .unwrap_or_default();

    TestResultRecord {
        name: outcome.id.clone(),
        success: outcome.status.is_success(),
        time_in_ms: outcome.durations.total_ms(),
        call_graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        coverage::CoverageData,
        outcome::{PhaseDurations, TestStatus},
        reducer::ContextReducer,
    };
    use camino::Utf8Path;
    use impact_metadata::{Scope, TestId};
    use pretty_assertions::assert_eq;

    fn outcome(id: &str, status: TestStatus, call: f64) -> RawOutcome {
        RawOutcome::new(
            id,
            status,
            PhaseDurations {
                call: Some(call),
                ..PhaseDurations::default()
            },
        )
    }

    #[test]
    fn records_in_outcome_order() {
        let mut data = CoverageData::new();
        data.add("/repo/src/app.py", 10, "tests/t.py::test_b|run");
        data.add("/repo/src/app.py", 3, "tests/t.py::test_b|run");
        data.add("/repo/src/app.py", 3, "tests/t.py::test_skipped|run");
        let scopes = ContextReducer::new(Utf8Path::new("/repo"), "|").reduce(&data);

        let outcomes = vec![
            outcome("tests/t.py::test_b", TestStatus::Passed, 0.25),
            outcome("tests/t.py::test_skipped", TestStatus::Skipped, 0.0),
            outcome("tests/t.py::test_a", TestStatus::Failed, 0.5),
            outcome("tests/t.py::test_xfail", TestStatus::XFailed, 0.1),
            outcome("tests/t.py::test_xpass", TestStatus::XPassed, 0.1),
            outcome("tests/t.py::test_err", TestStatus::Error, 0.0),
        ];

        let records = aggregate(&outcomes, &scopes);
        assert_eq!(
            records,
            vec![
                TestResultRecord {
                    name: TestId::new("tests/t.py::test_b"),
                    success: true,
                    time_in_ms: 250.0,
                    call_graph: vec![Scope::line("src/app.py", 3), Scope::line("src/app.py", 10)],
                },
                TestResultRecord {
                    name: TestId::new("tests/t.py::test_a"),
                    success: false,
                    time_in_ms: 500.0,
                    call_graph: vec![],
                },
                TestResultRecord {
                    name: TestId::new("tests/t.py::test_xpass"),
                    success: false,
                    time_in_ms: 100.0,
                    call_graph: vec![],
                },
                TestResultRecord {
                    name: TestId::new("tests/t.py::test_err"),
                    success: false,
                    time_in_ms: 0.0,
                    call_graph: vec![],
                },
            ]
        );
    }

    #[test]
    fn empty_outcomes() {
        assert!(aggregate(&[], &TestScopes::default()).is_empty());
    }
}
