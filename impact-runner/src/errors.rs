// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by test-impact.

use camino::Utf8PathBuf;
use config::ConfigError;
use std::{fmt, string::FromUtf8Error};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse test-impact config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// A command was configured as an empty list.
    #[error("`{key}` must contain at least one element (the program to run)")]
    EmptyCommand {
        /// The config key.
        key: &'static str,
    },

    /// The coverage context separator was configured as an empty string.
    #[error("`coverage.context-separator` must not be empty")]
    EmptyContextSeparator,
}

/// An error that occurred while parsing the selection input.
#[derive(Debug, Error)]
#[error("selection input must be a JSON object mapping test identifiers to booleans")]
pub struct SelectionParseError {
    #[source]
    err: serde_json::Error,
}

impl SelectionParseError {
    pub(crate) fn new(err: serde_json::Error) -> Self {
        Self { err }
    }
}

/// An error that occurs while collecting the list of tests.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CreateTestListError {
    /// Running the collection command failed.
    #[error("running command `{}` failed", shell_words::join(command))]
    Command {
        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The collection command was terminated before it could exit.
    #[error("command `{}` was terminated by a signal", shell_words::join(command))]
    Terminated {
        /// The command that was run.
        command: Vec<String>,
    },

    /// The collection command succeeded, but no tests could be parsed from its output.
    #[error(
        "command `{}` succeeded, but no tests could be parsed from its output:\n{output}",
        shell_words::join(command)
    )]
    UnparseableOutput {
        /// The command that was run.
        command: Vec<String>,

        /// The output of the command.
        output: String,
    },

    /// The engine reported a successful collection pass with no tests in it.
    #[error("test engine reported success, but listed no tests")]
    EmptyTestList,

    /// The collection command produced output that wasn't valid UTF-8.
    #[error("command `{}` produced non-UTF-8 output", shell_words::join(command))]
    InvalidUtf8 {
        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: FromUtf8Error,
    },
}

impl CreateTestListError {
    pub(crate) fn command(
        command: impl IntoIterator<Item = impl Into<String>>,
        error: std::io::Error,
    ) -> Self {
        Self::Command {
            command: command.into_iter().map(|s| s.into()).collect(),
            error,
        }
    }

    pub(crate) fn terminated(command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Terminated {
            command: command.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub(crate) fn unparseable_output(
        command: impl IntoIterator<Item = impl Into<String>>,
        output: String,
    ) -> Self {
        Self::UnparseableOutput {
            command: command.into_iter().map(|s| s.into()).collect(),
            output,
        }
    }

    pub(crate) fn invalid_utf8(
        command: impl IntoIterator<Item = impl Into<String>>,
        error: FromUtf8Error,
    ) -> Self {
        Self::InvalidUtf8 {
            command: command.into_iter().map(|s| s.into()).collect(),
            error,
        }
    }
}

/// An error that occurred while recording or exporting coverage data.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageError {
    /// The temporary directory for the coverage session could not be created.
    #[error("error creating temporary directory for coverage data")]
    TempDirCreate {
        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// Running the export command failed.
    #[error("running command `{}` failed", shell_words::join(command))]
    ExportExec {
        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The export command exited with a failure.
    #[error(
        "command `{}` {}\n{stderr}",
        shell_words::join(command),
        DisplayExitCode(*exit_code)
    )]
    ExportFailed {
        /// The command that was run.
        command: Vec<String>,

        /// The exit code, or `None` if the command was terminated by a signal.
        exit_code: Option<i32>,

        /// Standard error produced by the command.
        stderr: String,
    },

    /// The exported coverage data could not be read.
    #[error("error reading coverage export at `{path}`")]
    Read {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The exported coverage data could not be parsed.
    #[error("error parsing coverage export at `{path}`")]
    Parse {
        /// The path that was parsed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: CoverageParseError,
    },
}

/// An error that occurred while parsing a coverage.py JSON export.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CoverageParseError {
    /// The export was not valid JSON of the expected shape.
    #[error("invalid coverage JSON")]
    Json(#[from] serde_json::Error),

    /// A line number key was not a positive integer.
    #[error("for file `{file}`, invalid line number `{line}`")]
    InvalidLineNumber {
        /// The file the line number was recorded for.
        file: String,

        /// The line number as it appeared in the export.
        line: String,
    },
}

/// An error that occurred while running tests through the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineRunError {
    /// Running the engine failed.
    #[error("running command `{}` failed", shell_words::join(command))]
    Exec {
        /// The command that was run.
        command: Vec<String>,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The engine was terminated before it could exit.
    #[error("command `{}` was terminated by a signal", shell_words::join(command))]
    Terminated {
        /// The command that was run.
        command: Vec<String>,
    },

    /// The files that apply skip directives could not be set up.
    #[error("error setting up test selection at `{path}`")]
    SelectionSetup {
        /// The path that was being written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The engine exited successfully but didn't write its results report.
    #[error("test results report not found at `{path}`")]
    ReportMissing {
        /// The path the report was expected at.
        path: Utf8PathBuf,
    },

    /// The results report could not be read.
    #[error("error reading test results report at `{path}`")]
    ReportRead {
        /// The path that was read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: std::io::Error,
    },

    /// The results report could not be parsed.
    #[error("error parsing test results report at `{path}`")]
    ReportParse {
        /// The path that was parsed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// Coverage data for the run could not be exported.
    #[error("error exporting coverage data")]
    Coverage(#[source] CoverageError),
}

impl EngineRunError {
    pub(crate) fn exec(
        command: impl IntoIterator<Item = impl Into<String>>,
        error: std::io::Error,
    ) -> Self {
        Self::Exec {
            command: command.into_iter().map(|s| s.into()).collect(),
            error,
        }
    }

    pub(crate) fn terminated(command: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Terminated {
            command: command.into_iter().map(|s| s.into()).collect(),
        }
    }

    pub(crate) fn selection_setup(path: impl Into<Utf8PathBuf>, error: std::io::Error) -> Self {
        Self::SelectionSetup {
            path: path.into(),
            error,
        }
    }
}

impl From<CoverageError> for EngineRunError {
    fn from(error: CoverageError) -> Self {
        Self::Coverage(error)
    }
}

/// An error that occurred while writing an event to the reporter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteEventError {
    /// An error occurred while writing the event to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),
}

/// An error that occurred while writing a test list or run summary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteTestListError {
    /// An error occurred while writing to the provided output.
    #[error("error writing to output")]
    Io(#[source] std::io::Error),

    /// An error occurred while serializing JSON.
    #[error("error serializing to JSON")]
    Json(#[source] serde_json::Error),
}

/// An error that occurred during an impact run.
#[derive(Debug, Error)]
pub enum RunError {
    /// Collecting tests failed.
    #[error("error collecting tests")]
    CreateTestList(#[from] CreateTestListError),

    /// Starting the coverage session failed.
    #[error("error starting coverage session")]
    Coverage(#[from] CoverageError),

    /// Running tests through the engine failed.
    #[error("error running tests")]
    EngineRun(#[from] EngineRunError),

    /// Writing an event to the reporter failed.
    #[error("error writing event")]
    WriteEvent(#[from] WriteEventError),
}

struct DisplayExitCode(Option<i32>);

impl fmt::Display for DisplayExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(code) => write!(f, "exited with code {code}"),
            None => f.write_str("was terminated by a signal"),
        }
    }
}
