// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use impact_metadata::ImpactExitCode;
use impact_runner::errors::*;
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that test-impact knows how to report, with a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("selection input parse error")]
    SelectionParseError {
        #[from]
        err: SelectionParseError,
    },
    #[error("could not determine repository root")]
    RepoRootInvalid {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("error creating test list")]
    CreateTestListError {
        #[from]
        err: CreateTestListError,
    },
    #[error("coverage session error")]
    CoverageError {
        #[from]
        err: CoverageError,
    },
    #[error("test engine run error")]
    EngineRunError {
        #[from]
        err: EngineRunError,
    },
    #[error("error writing event")]
    WriteEventError {
        #[from]
        err: WriteEventError,
    },
    #[error("error writing test list")]
    WriteTestListError {
        #[from]
        err: WriteTestListError,
    },
    #[error("error writing run summary")]
    WriteSummaryError {
        #[source]
        err: std::io::Error,
    },
}

impl ExpectedError {
    pub(crate) fn repo_root_invalid(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::RepoRootInvalid {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn write_summary_error(err: impl Into<std::io::Error>) -> Self {
        Self::WriteSummaryError { err: err.into() }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::SelectionParseError { .. } => ImpactExitCode::INVALID_SELECTION,
            Self::RepoRootInvalid { .. } | Self::ConfigParseError { .. } => {
                ImpactExitCode::SETUP_ERROR
            }
            Self::CreateTestListError { .. } => ImpactExitCode::TEST_LIST_CREATION_FAILED,
            Self::CoverageError { .. } => ImpactExitCode::COVERAGE_FAILED,
            Self::EngineRunError { err } => match err {
                EngineRunError::Exec { .. }
                | EngineRunError::Terminated { .. }
                | EngineRunError::SelectionSetup { .. } => ImpactExitCode::ENGINE_EXEC_FAILED,
                EngineRunError::Coverage(_) => ImpactExitCode::COVERAGE_FAILED,
                _ => ImpactExitCode::RESULTS_READ_FAILED,
            },
            Self::WriteEventError { .. }
            | Self::WriteTestListError { .. }
            | Self::WriteSummaryError { .. } => ImpactExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::SelectionParseError { err } => {
                error!("failed to parse selection input");
                Some(err as &dyn Error)
            }
            Self::RepoRootInvalid { path, err } => {
                error!(
                    "could not determine repository root from `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::ConfigParseError { err } => {
                match err.kind() {
                    ConfigParseErrorKind::DeserializeError(path_error) => {
                        error!(
                            "failed to parse test-impact config at `{}` (key `{}`)",
                            err.config_file().style(styles.bold),
                            path_error.path().style(styles.bold),
                        );
                    }
                    _ => {
                        error!(
                            "failed to parse test-impact config at `{}`",
                            err.config_file().style(styles.bold)
                        );
                    }
                }
                Some(err.kind() as &dyn Error)
            }
            Self::CreateTestListError { err } => {
                error!("failed to collect tests");
                Some(err as &dyn Error)
            }
            Self::CoverageError { err } => {
                error!("failed to record coverage data");
                Some(err as &dyn Error)
            }
            Self::EngineRunError { err } => {
                error!("failed to run tests");
                Some(err as &dyn Error)
            }
            Self::WriteEventError { err } => {
                error!("failed to write event to output");
                Some(err as &dyn Error)
            }
            Self::WriteTestListError { err } => {
                error!("failed to write test list to output");
                Some(err as &dyn Error)
            }
            Self::WriteSummaryError { err } => {
                error!("failed to write run summary to output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}

impl From<RunError> for ExpectedError {
    fn from(err: RunError) -> Self {
        match err {
            RunError::CreateTestList(err) => err.into(),
            RunError::Coverage(err) => err.into(),
            RunError::EngineRun(err) => err.into(),
            RunError::WriteEvent(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_run_exit_codes() {
        let exec = ExpectedError::from(EngineRunError::Exec {
            command: vec!["python3".to_owned()],
            error: std::io::Error::from(std::io::ErrorKind::NotFound),
        });
        assert_eq!(exec.process_exit_code(), ImpactExitCode::ENGINE_EXEC_FAILED);

        let missing = ExpectedError::from(EngineRunError::ReportMissing {
            path: "/tmp/report.json".into(),
        });
        assert_eq!(
            missing.process_exit_code(),
            ImpactExitCode::RESULTS_READ_FAILED
        );

        let coverage = ExpectedError::from(RunError::EngineRun(EngineRunError::Coverage(
            CoverageError::TempDirCreate {
                error: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            },
        )));
        assert_eq!(coverage.process_exit_code(), ImpactExitCode::COVERAGE_FAILED);
    }
}
