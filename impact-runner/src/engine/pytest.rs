// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::ImpactConfig,
    coverage::CoverageSession,
    engine::{CollectedTests, EngineRun, TestEngine},
    errors::{CreateTestListError, EngineRunError},
    list::TestList,
    outcome::{PhaseDurations, RawOutcome, TestStatus},
};
use camino::{Utf8Path, Utf8PathBuf};
use duct::cmd;
use impact_metadata::{PytestExitCode, TestId};
use serde::Deserialize;
use std::{ffi::OsString, io};
use tracing::{debug, warn};

/// Drives pytest, with the `pytest-cov` and `pytest-json-report` plugins.
///
/// Tests are collected with `--collect-only -q`. Tests are run with coverage contexts recorded
/// per test, and results are read back from the JSON report.
///
/// Skipped tests are marked at collection time by a small plugin, loaded with
/// `-p test_impact_selection`, which matches node IDs exactly.
#[derive(Clone, Debug)]
pub struct PytestEngine {
    program: String,
    base_args: Vec<String>,
    extra_args: Vec<String>,
    user_args: Vec<String>,
    coverage_source: Vec<String>,
    repo_root: Utf8PathBuf,
}

impl PytestEngine {
    /// The name of the JSON report, within the coverage session's directory.
    pub const REPORT_FILE_NAME: &'static str = "report.json";

    /// The module name the selection plugin is loaded as.
    pub const SELECTION_PLUGIN: &'static str = "test_impact_selection";

    /// The environment variable the selection plugin reads the list of tests to skip from.
    pub const SKIP_FILE_ENV: &'static str = "TEST_IMPACT_SKIP_FILE";

    const SKIP_FILE_NAME: &'static str = "skip.json";
    const PLUGIN_SOURCE: &'static str = include_str!("selection_plugin.py");

    /// Creates a new engine from the given config.
    ///
    /// `user_args` are passed through to every pytest invocation after all other arguments.
    pub fn new(config: &ImpactConfig, user_args: Vec<String>) -> Self {
        let (program, base_args) = config.engine().program_and_args();
        Self {
            program: program.to_owned(),
            base_args: base_args.to_vec(),
            extra_args: config.engine().extra_args.clone(),
            user_args,
            coverage_source: config.coverage().source.clone(),
            repo_root: config.repo_root().to_owned(),
        }
    }

    /// Returns the arguments used to collect tests.
    ///
    /// Verbosity flags from the configured and user arguments are dropped, since the test list is
    /// parsed from the `-q` output format.
    pub fn collect_args(&self) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(["--rootdir".to_owned(), self.repo_root.to_string()]);
        args.extend(
            self.extra_args
                .iter()
                .chain(&self.user_args)
                .filter(|arg| !is_verbosity_arg(arg))
                .cloned(),
        );
        args.extend(["--collect-only".to_owned(), "-q".to_owned()]);
        args
    }

    /// Returns the arguments used to run tests, writing the JSON report to `report_file`.
    pub fn execute_args(&self, report_file: &Utf8Path) -> Vec<String> {
        let mut args = self.base_args.clone();
        args.extend(["--rootdir".to_owned(), self.repo_root.to_string()]);
        args.push("-v".to_owned());
        if self.coverage_source.is_empty() {
            args.push("--cov".to_owned());
        } else {
            args.extend(
                self.coverage_source
                    .iter()
                    .map(|source| format!("--cov={source}")),
            );
        }
        args.push("--cov-context=test".to_owned());
        args.push("--json-report".to_owned());
        args.push(format!("--json-report-file={report_file}"));
        args.extend(["-p".to_owned(), Self::SELECTION_PLUGIN.to_owned()]);
        args.extend(self.extra_args.iter().cloned());
        args.extend(self.user_args.iter().cloned());
        args
    }

    /// Writes the selection plugin and the list of tests to skip into `dir`, returning the
    /// environment pytest must be run with.
    fn write_selection(
        &self,
        dir: &Utf8Path,
        test_list: &TestList,
    ) -> Result<Vec<(&'static str, OsString)>, EngineRunError> {
        let plugin_file = dir.join(format!("{}.py", Self::SELECTION_PLUGIN));
        std::fs::write(&plugin_file, Self::PLUGIN_SOURCE)
            .map_err(|error| EngineRunError::selection_setup(&plugin_file, error))?;

        let skip_file = dir.join(Self::SKIP_FILE_NAME);
        let skipped: Vec<_> = test_list.iter_skipped().collect();
        let json = serde_json::to_vec(&skipped).map_err(|error| {
            EngineRunError::selection_setup(&skip_file, io::Error::other(error))
        })?;
        std::fs::write(&skip_file, json)
            .map_err(|error| EngineRunError::selection_setup(&skip_file, error))?;
        debug!("wrote {} tests to skip to {skip_file}", skipped.len());

        // The plugin is imported from the session directory, ahead of anything already on the
        // path.
        let existing = std::env::var_os("PYTHONPATH").unwrap_or_default();
        let python_path = std::env::join_paths(
            std::iter::once(dir.as_std_path().to_owned()).chain(std::env::split_paths(&existing)),
        )
        .map_err(|error| EngineRunError::selection_setup(dir, io::Error::other(error)))?;

        Ok(vec![
            ("PYTHONPATH", python_path),
            (Self::SKIP_FILE_ENV, skip_file.into_std_path_buf().into_os_string()),
        ])
    }

    fn command_line(&self, args: &[String]) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(args.iter().cloned())
            .collect()
    }

    fn read_report(
        &self,
        report_file: &Utf8Path,
        status_code: i32,
    ) -> Result<Vec<RawOutcome>, EngineRunError> {
        let json = match std::fs::read_to_string(report_file) {
            Ok(json) => json,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                if status_code == PytestExitCode::OK {
                    return Err(EngineRunError::ReportMissing {
                        path: report_file.to_owned(),
                    });
                }
                warn!("pytest exited with status {status_code} without writing a results report");
                return Ok(Vec::new());
            }
            Err(error) => {
                return Err(EngineRunError::ReportRead {
                    path: report_file.to_owned(),
                    error,
                });
            }
        };

        parse_json_report(&json).map_err(|error| EngineRunError::ReportParse {
            path: report_file.to_owned(),
            error,
        })
    }
}

impl TestEngine for PytestEngine {
    fn collect(&self) -> Result<CollectedTests, CreateTestListError> {
        let args = self.collect_args();
        let command = self.command_line(&args);
        debug!("collecting tests: {}", shell_words::join(&command));

        let output = cmd(&self.program, &args)
            .dir(self.repo_root.as_std_path())
            .stdout_capture()
            .unchecked()
            .run()
            .map_err(|error| CreateTestListError::command(&command, error))?;
        let Some(status_code) = output.status.code() else {
            return Err(CreateTestListError::terminated(&command));
        };

        let stdout = String::from_utf8(output.stdout)
            .map_err(|error| CreateTestListError::invalid_utf8(&command, error))?;

        collected_from_output(&command, status_code, stdout)
    }

    fn execute(
        &self,
        test_list: &TestList,
        coverage: CoverageSession,
    ) -> Result<EngineRun, EngineRunError> {
        let report_file = coverage.dir().join(Self::REPORT_FILE_NAME);
        let selection_env = self.write_selection(coverage.dir(), test_list)?;
        let args = self.execute_args(&report_file);
        let command = self.command_line(&args);
        debug!("running tests: {}", shell_words::join(&command));

        let mut expression = cmd(&self.program, &args)
            .dir(self.repo_root.as_std_path())
            // stdout is reserved for machine-readable output.
            .stdout_to_stderr()
            .unchecked();
        for (name, value) in coverage.env_vars() {
            expression = expression.env(name, value.as_std_path());
        }
        for (name, value) in selection_env {
            expression = expression.env(name, value);
        }

        let output = expression
            .run()
            .map_err(|error| EngineRunError::exec(&command, error))?;
        let Some(status_code) = output.status.code() else {
            return Err(EngineRunError::terminated(&command));
        };
        debug!("pytest exited with status {status_code}");

        // The report lives in the session directory, so it must be read before the session ends.
        let outcomes = self.read_report(&report_file, status_code)?;
        let coverage = coverage.finish()?;

        Ok(EngineRun {
            status_code,
            outcomes,
            coverage,
        })
    }
}

/// Builds the result of a collection pass from pytest's status and output.
///
/// A successful pass always lists at least one test: pytest exits with `NO_TESTS_COLLECTED`
/// otherwise. If nothing could be parsed, the output wasn't in the expected format.
pub(crate) fn collected_from_output(
    command: &[String],
    status_code: i32,
    stdout: String,
) -> Result<CollectedTests, CreateTestListError> {
    if status_code != PytestExitCode::OK {
        // pytest reports collection errors on stdout.
        if status_code != PytestExitCode::NO_TESTS_COLLECTED {
            warn!("collecting tests failed with status {status_code}:\n{stdout}");
        }
        return Ok(CollectedTests {
            status_code,
            test_ids: Vec::new(),
        });
    }

    let test_ids = parse_collect_output(&stdout);
    if test_ids.is_empty() {
        return Err(CreateTestListError::unparseable_output(command, stdout));
    }
    debug!("collected {} tests", test_ids.len());
    Ok(CollectedTests {
        status_code,
        test_ids,
    })
}

/// Returns true if `arg` only changes pytest's verbosity (`-v`, `-qq`, `--verbose`,
/// `--verbosity=2` and so on).
fn is_verbosity_arg(arg: &str) -> bool {
    match arg {
        "--verbose" | "--quiet" => true,
        _ if arg.starts_with("--verbosity") => true,
        _ => arg
            .strip_prefix('-')
            .is_some_and(|flags| !flags.is_empty() && flags.chars().all(|c| c == 'v' || c == 'q')),
    }
}

/// Parses the output of `pytest --collect-only -q`.
///
/// Test identifiers are the unindented lines containing `::`, up to the first blank line. The
/// summary and any warnings follow that blank line.
pub(crate) fn parse_collect_output(output: &str) -> Vec<TestId> {
    output
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .filter(|line| !line.starts_with(char::is_whitespace) && line.contains("::"))
        .map(|line| TestId::new(line.trim_end()))
        .collect()
}

#[derive(Debug, Deserialize)]
struct JsonReport {
    #[serde(default)]
    tests: Vec<JsonReportTest>,
}

#[derive(Debug, Deserialize)]
struct JsonReportTest {
    nodeid: String,
    outcome: TestStatus,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    setup: Option<JsonReportPhase>,
    #[serde(default)]
    call: Option<JsonReportPhase>,
    #[serde(default)]
    teardown: Option<JsonReportPhase>,
}

#[derive(Debug, Deserialize)]
struct JsonReportPhase {
    #[serde(default)]
    duration: Option<f64>,
}

impl JsonReportPhase {
    fn duration(phase: Option<&Self>) -> Option<f64> {
        phase.and_then(|phase| phase.duration)
    }
}

/// Parses the report written by `pytest-json-report` into raw outcomes, in report order.
pub(crate) fn parse_json_report(json: &str) -> Result<Vec<RawOutcome>, serde_json::Error> {
    let report: JsonReport = serde_json::from_str(json)?;
    Ok(report
        .tests
        .into_iter()
        .map(|test| {
            let durations = PhaseDurations {
                setup: JsonReportPhase::duration(test.setup.as_ref()),
                call: JsonReportPhase::duration(test.call.as_ref()).or(test.duration),
                teardown: JsonReportPhase::duration(test.teardown.as_ref()),
            };
            RawOutcome::new(test.nodeid, test.outcome, durations)
        })
        .collect())
}
