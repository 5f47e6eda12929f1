// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8Path;
use camino_tempfile::Utf8TempDir;
use impact_metadata::TestId;
use impact_runner::{
    config::ImpactConfig,
    coverage::{CoverageData, CoverageSession},
    engine::{CollectedTests, EngineRun, TestEngine},
    errors::{CreateTestListError, EngineRunError},
    list::TestList,
    outcome::{PhaseDurations, RawOutcome, TestStatus},
    reporter::{ReporterStderr, TestReporterBuilder},
    runner::{ImpactRun, ImpactRunner},
    selection::SelectionPolicy,
};
use std::cell::RefCell;

/// An engine that reports scripted results instead of running pytest.
#[derive(Debug, Default)]
pub(crate) struct ScriptedEngine {
    pub(crate) collect_status: i32,
    pub(crate) collected: Vec<TestId>,
    pub(crate) run_status: i32,
    pub(crate) outcomes: Vec<RawOutcome>,
    pub(crate) coverage: CoverageData,

    /// The tests passed to each call to `execute`, in order.
    pub(crate) executed: RefCell<Vec<Vec<TestId>>>,
}

impl ScriptedEngine {
    pub(crate) fn new(collected: &[&str]) -> Self {
        Self {
            collected: collected.iter().copied().map(TestId::new).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn with_outcome(mut self, id: &str, status: TestStatus, call_secs: f64) -> Self {
        self.outcomes.push(RawOutcome::new(
            id,
            status,
            PhaseDurations {
                call: Some(call_secs),
                ..PhaseDurations::default()
            },
        ));
        self
    }

    pub(crate) fn with_run_status(mut self, run_status: i32) -> Self {
        self.run_status = run_status;
        self
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.executed.borrow().len()
    }
}

impl TestEngine for ScriptedEngine {
    fn collect(&self) -> Result<CollectedTests, CreateTestListError> {
        Ok(CollectedTests {
            status_code: self.collect_status,
            test_ids: if self.collect_status == 0 {
                self.collected.clone()
            } else {
                Vec::new()
            },
        })
    }

    fn execute(
        &self,
        test_list: &TestList,
        coverage: CoverageSession,
    ) -> Result<EngineRun, EngineRunError> {
        assert!(coverage.dir().is_dir(), "coverage session directory exists");

        let to_run = test_list
            .iter_tests()
            .filter(|test| test.info.directive.is_executed())
            .map(|test| test.id.clone())
            .collect();
        self.executed.borrow_mut().push(to_run);

        // Nothing was recorded into the session, so finishing it yields no data.
        let recorded = coverage.finish().map_err(EngineRunError::Coverage)?;
        assert!(recorded.is_empty());

        Ok(EngineRun {
            status_code: self.run_status,
            outcomes: self.outcomes.clone(),
            coverage: self.coverage.clone(),
        })
    }
}

/// A temporary repository root, with the default config.
pub(crate) struct TempRepo {
    dir: Utf8TempDir,
    config: ImpactConfig,
}

impl TempRepo {
    pub(crate) fn new() -> Self {
        let dir = camino_tempfile::tempdir().expect("tempdir created");
        let config = ImpactConfig::default_config(dir.path());
        Self { dir, config }
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.dir.path()
    }

    pub(crate) fn config(&self) -> &ImpactConfig {
        &self.config
    }

    /// Runs the engine with the given selection, returning the run and the reporter's output.
    pub(crate) fn run(
        &self,
        engine: &ScriptedEngine,
        policy: &SelectionPolicy,
    ) -> color_eyre::Result<(ImpactRun, String)> {
        let mut buf = Vec::new();
        let mut reporter = TestReporterBuilder::default()
            .set_verbose(true)
            .build(ReporterStderr::Buffer(&mut buf));
        let runner = ImpactRunner::new(engine, policy, &self.config);
        let run = runner.execute(|event| reporter.report_event(event))?;
        drop(reporter);

        Ok((run, String::from_utf8(buf)?))
    }
}
