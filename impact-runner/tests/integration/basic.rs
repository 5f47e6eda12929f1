// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::{ScriptedEngine, TempRepo};
use color_eyre::eyre::Result;
use impact_metadata::{Scope, TestId, TestResultRecord};
use impact_runner::{
    coverage::CoverageData,
    errors::{CreateTestListError, RunError},
    outcome::TestStatus,
    runner::ImpactRunner,
    selection::SelectionPolicy,
};
use pretty_assertions::assert_eq;

#[test]
fn outside_repo_coverage_is_dropped() -> Result<()> {
    let repo = TempRepo::new();
    let json = serde_json::json!({
        "files": {
            "src/app.py": {
                "contexts": { "10": ["tests/test_x.py::test_a|run"] }
            },
            "/usr/lib/python3/foo.py": {
                "contexts": { "5": ["tests/test_x.py::test_a|run"] }
            }
        }
    });
    let mut engine = ScriptedEngine::new(&["tests/test_x.py::test_a"]).with_outcome(
        "tests/test_x.py::test_a",
        TestStatus::Passed,
        0.125,
    );
    engine.coverage = CoverageData::from_coverage_json(&json.to_string(), repo.root())?;

    let (run, _) = repo.run(&engine, &SelectionPolicy::default())?;

    assert_eq!(run.status_code, 0);
    assert_eq!(
        run.records,
        vec![TestResultRecord {
            name: TestId::new("tests/test_x.py::test_a"),
            success: true,
            time_in_ms: 125.0,
            call_graph: vec![Scope::line("src/app.py", 10)],
        }]
    );

    Ok(())
}

#[test]
fn selection_directives_are_applied() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t1": true, "t2": false}"#)?;
    let engine = ScriptedEngine::new(&["t1", "t2", "t3"])
        .with_outcome("t2", TestStatus::Failed, 0.5)
        .with_outcome("t3", TestStatus::Passed, 0.25)
        .with_run_status(1);

    let (run, output) = repo.run(&engine, &policy)?;

    assert_eq!(
        engine.executed.borrow().as_slice(),
        &[vec![TestId::new("t2"), TestId::new("t3")]],
        "the skipped test is never handed to the engine"
    );
    assert_eq!(run.status_code, 0, "the only failure was expected");
    assert_eq!(
        run.records,
        vec![TestResultRecord {
            name: TestId::new("t3"),
            success: true,
            time_in_ms: 250.0,
            call_graph: vec![],
        }]
    );

    let statuses: Vec<_> = run
        .outcomes
        .iter()
        .map(|outcome| (outcome.id.as_str(), outcome.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("t1", TestStatus::Skipped),
            ("t2", TestStatus::XFailed),
            ("t3", TestStatus::Passed),
        ]
    );

    assert!(
        output.contains("Starting 2 tests (1 skipped, 1 expected to fail)"),
        "output: {output}"
    );
    assert!(
        output.contains("2 tests run: 1 passed, 1 expected failure, 1 skipped"),
        "output: {output}"
    );

    Ok(())
}

#[test]
fn expected_failure_that_passes_is_recorded() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t1": false}"#)?;
    let engine = ScriptedEngine::new(&["t1"]).with_outcome("t1", TestStatus::Passed, 0.0);

    let (run, _) = repo.run(&engine, &policy)?;

    assert_eq!(run.status_code, 0);
    assert_eq!(run.records.len(), 1);
    assert!(run.records[0].success);

    Ok(())
}

#[test]
fn unexpected_failure_keeps_status() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t1": false}"#)?;
    let engine = ScriptedEngine::new(&["t1", "t2"])
        .with_outcome("t1", TestStatus::Failed, 0.0)
        .with_outcome("t2", TestStatus::Failed, 0.0)
        .with_run_status(1);

    let (run, _) = repo.run(&engine, &policy)?;

    assert_eq!(run.status_code, 1);
    let summary = run.summary();
    let failed: Vec<_> = summary
        .failed_tests()
        .map(|record| record.name.as_str())
        .collect();
    assert_eq!(failed, vec!["t2"]);
    assert!(run.stats.any_failed());

    Ok(())
}

#[test]
fn engine_xpass_is_not_a_success() -> Result<()> {
    let repo = TempRepo::new();
    let engine = ScriptedEngine::new(&["t1"])
        .with_outcome("t1", TestStatus::XPassed, 0.0)
        .with_run_status(1);

    let (run, _) = repo.run(&engine, &SelectionPolicy::default())?;

    assert_eq!(run.records.len(), 1);
    assert!(!run.records[0].success);

    Ok(())
}

#[test]
fn collection_failure_is_passed_through() -> Result<()> {
    let repo = TempRepo::new();
    let mut engine = ScriptedEngine::new(&["t1"]);
    engine.collect_status = 2;

    let (run, output) = repo.run(&engine, &SelectionPolicy::default())?;

    assert_eq!(run.status_code, 2);
    assert!(run.records.is_empty());
    assert_eq!(engine.execute_calls(), 0);
    assert_eq!(
        output,
        "       Error collecting tests exited with status 2\n"
    );

    Ok(())
}

#[test]
fn all_skipped_does_not_run_engine() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t1": true, "t2": true}"#)?;
    let engine = ScriptedEngine::new(&["t1", "t2"]);

    let (run, output) = repo.run(&engine, &policy)?;

    assert_eq!(engine.execute_calls(), 0);
    assert_eq!(run.status_code, 0);
    assert!(run.records.is_empty());
    assert_eq!(run.stats.skipped, 2);
    assert!(output.contains("        SKIP [   0.000s] t1 (skip)\n"), "output: {output}");

    Ok(())
}

#[test]
fn uncollected_outcomes_are_kept() -> Result<()> {
    let repo = TempRepo::new();
    let engine = ScriptedEngine::new(&["t1"])
        .with_outcome("t_generated", TestStatus::Passed, 0.0)
        .with_outcome("t1", TestStatus::Passed, 0.0);

    let (run, _) = repo.run(&engine, &SelectionPolicy::default())?;

    let names: Vec<_> = run
        .records
        .iter()
        .map(|record| record.name.as_str())
        .collect();
    assert_eq!(names, vec!["t1", "t_generated"]);

    Ok(())
}

#[test]
fn overlapping_identifiers_are_selected_exactly() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t.py::test_a": true}"#)?;
    let engine = ScriptedEngine::new(&["t.py::test_a", "t.py::test_a_slow", "t.py::test_b"])
        .with_outcome("t.py::test_a_slow", TestStatus::Passed, 0.5)
        .with_outcome("t.py::test_b", TestStatus::Passed, 0.25);

    let (run, output) = repo.run(&engine, &policy)?;

    assert_eq!(
        engine.executed.borrow().as_slice(),
        &[vec![
            TestId::new("t.py::test_a_slow"),
            TestId::new("t.py::test_b")
        ]],
    );
    assert_eq!(run.status_code, 0);
    let names: Vec<_> = run
        .records
        .iter()
        .map(|record| (record.name.as_str(), record.success))
        .collect();
    assert_eq!(
        names,
        vec![("t.py::test_a_slow", true), ("t.py::test_b", true)]
    );
    assert!(
        output.contains("2 tests run: 2 passed, 1 skipped"),
        "output: {output}"
    );

    Ok(())
}

#[test]
fn missing_result_is_recorded_as_unknown() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t.py::test_a": true}"#)?;
    // The engine dropped test_a_slow along with test_a.
    let engine = ScriptedEngine::new(&["t.py::test_a", "t.py::test_a_slow", "t.py::test_b"])
        .with_outcome("t.py::test_b", TestStatus::Passed, 0.25);

    let (run, output) = repo.run(&engine, &policy)?;

    let statuses: Vec<_> = run
        .outcomes
        .iter()
        .map(|outcome| (outcome.id.as_str(), outcome.status))
        .collect();
    assert_eq!(
        statuses,
        vec![
            ("t.py::test_a", TestStatus::Skipped),
            ("t.py::test_a_slow", TestStatus::Unknown),
            ("t.py::test_b", TestStatus::Passed),
        ]
    );
    assert_eq!(
        run.records[0],
        TestResultRecord {
            name: TestId::new("t.py::test_a_slow"),
            success: false,
            time_in_ms: 0.0,
            call_graph: vec![],
        }
    );
    assert_eq!(run.stats.unknown, 1);
    assert!(run.stats.any_failed());
    assert!(
        output.contains("     UNKNOWN [   0.000s] t.py::test_a_slow\n"),
        "output: {output}"
    );
    assert!(
        output.contains("2 tests run: 1 passed, 1 unknown, 1 skipped"),
        "output: {output}"
    );

    Ok(())
}

#[test]
fn missing_result_keeps_failed_status() -> Result<()> {
    let repo = TempRepo::new();
    let policy = SelectionPolicy::parse_json(r#"{"t1": false}"#)?;
    let engine = ScriptedEngine::new(&["t1", "t2"])
        .with_outcome("t1", TestStatus::Failed, 0.0)
        .with_run_status(1);

    let (run, _) = repo.run(&engine, &policy)?;

    assert_eq!(
        run.status_code, 1,
        "t2 has no result, so the expected failure of t1 doesn't make the run pass"
    );

    Ok(())
}

#[test]
fn failed_status_without_outcomes_is_kept() -> Result<()> {
    let repo = TempRepo::new();
    let engine = ScriptedEngine::new(&["t1"]).with_run_status(1);

    let (run, _) = repo.run(&engine, &SelectionPolicy::default())?;

    assert_eq!(run.status_code, 1);
    assert!(run.records.is_empty());

    Ok(())
}

#[test]
fn empty_collection_is_an_error() {
    let repo = TempRepo::new();
    let engine = ScriptedEngine::new(&[]);
    let policy = SelectionPolicy::default();

    let runner = ImpactRunner::new(&engine, &policy, repo.config());
    let error = runner
        .execute(|_| Ok(()))
        .expect_err("collection succeeded without listing any tests");

    assert!(
        matches!(
            error,
            RunError::CreateTestList(CreateTestListError::EmptyTestList)
        ),
        "unexpected error: {error:?}"
    );
    assert_eq!(engine.execute_calls(), 0);
}
