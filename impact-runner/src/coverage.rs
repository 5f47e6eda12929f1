// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Recording and exporting per-test line coverage.
//!
//! A [`CoverageSession`] bounds coverage measurement for exactly one engine run. It owns a
//! temporary directory that the engine records coverage data into, and [`CoverageSession::finish`]
//! exports that data through coverage.py's JSON report into a [`CoverageData`].

use crate::{
    config::CoverageConfig,
    errors::{CoverageError, CoverageParseError},
};
use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use duct::cmd;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// The set of context labels recorded for each covered line of a file.
pub type LineContexts = BTreeMap<u32, BTreeSet<String>>;

/// Raw coverage data: for every measured file, the context labels recorded for each line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CoverageData {
    files: BTreeMap<Utf8PathBuf, LineContexts>,
}

impl CoverageData {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `line` of `file` executed while the given context was active.
    pub fn add(&mut self, file: impl Into<Utf8PathBuf>, line: u32, context: impl Into<String>) {
        self.files
            .entry(file.into())
            .or_default()
            .entry(line)
            .or_default()
            .insert(context.into());
    }

    /// Returns the number of measured files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Returns true if no files were measured.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterates over measured files and their per-line contexts.
    pub fn iter(&self) -> impl Iterator<Item = (&Utf8Path, &LineContexts)> + '_ {
        self.files.iter().map(|(path, lines)| (path.as_path(), lines))
    }

    /// Parses the output of `coverage json --show-contexts`.
    ///
    /// Relative file names are resolved against `base_dir`.
    pub fn from_coverage_json(json: &str, base_dir: &Utf8Path) -> Result<Self, CoverageParseError> {
        let export: CoverageJson = serde_json::from_str(json)?;

        let mut data = Self::new();
        for (name, file) in export.files {
            let path = Utf8Path::new(&name);
            let path = if path.is_relative() {
                base_dir.join(path)
            } else {
                path.to_owned()
            };

            let lines = data.files.entry(path).or_default();
            for (line, contexts) in file.contexts {
                let line_no = line
                    .parse::<u32>()
                    .ok()
                    .filter(|&n| n > 0)
                    .ok_or_else(|| CoverageParseError::InvalidLineNumber {
                        file: name.clone(),
                        line: line.clone(),
                    })?;
                lines.entry(line_no).or_default().extend(contexts);
            }
        }

        Ok(data)
    }
}

#[derive(Debug, Deserialize)]
struct CoverageJson {
    #[serde(default)]
    files: BTreeMap<String, CoverageJsonFile>,
}

#[derive(Debug, Deserialize)]
struct CoverageJsonFile {
    #[serde(default)]
    contexts: BTreeMap<String, Vec<String>>,
}

/// The environment for one engine run with coverage recording enabled.
#[derive(Debug)]
pub struct CoverageSession {
    dir: Utf8TempDir,
    program: String,
    args: Vec<String>,
    repo_root: Utf8PathBuf,
}

impl CoverageSession {
    /// The environment variable coverage.py reads its data file location from.
    pub const DATA_FILE_ENV: &'static str = "COVERAGE_FILE";

    const DATA_FILE_NAME: &'static str = ".coverage";
    const EXPORT_FILE_NAME: &'static str = "coverage.json";

    /// Starts a new session, creating its temporary directory.
    pub fn start(config: &CoverageConfig, repo_root: &Utf8Path) -> Result<Self, CoverageError> {
        let dir = camino_tempfile::Builder::new()
            .prefix("test-impact-")
            .tempdir()
            .map_err(|error| CoverageError::TempDirCreate { error })?;
        debug!("started coverage session in {}", dir.path());

        let (program, args) = config.program_and_args();
        Ok(Self {
            dir,
            program: program.to_owned(),
            args: args.to_vec(),
            repo_root: repo_root.to_owned(),
        })
    }

    /// Returns the temporary directory owned by this session.
    ///
    /// Engines may write their own intermediate files here. The directory is removed once the
    /// session is finished or dropped.
    pub fn dir(&self) -> &Utf8Path {
        self.dir.path()
    }

    /// Returns the path the engine must record coverage data to.
    pub fn data_file(&self) -> Utf8PathBuf {
        self.dir.path().join(Self::DATA_FILE_NAME)
    }

    /// Returns the environment variables the engine must be run with.
    pub fn env_vars(&self) -> impl Iterator<Item = (&'static str, Utf8PathBuf)> {
        std::iter::once((Self::DATA_FILE_ENV, self.data_file()))
    }

    /// Ends the session, exporting the recorded coverage data.
    ///
    /// If the engine didn't record any data, the result is empty.
    pub fn finish(self) -> Result<CoverageData, CoverageError> {
        let data_file = self.data_file();
        if !data_file.exists() {
            debug!("no coverage data recorded at {data_file}");
            return Ok(CoverageData::new());
        }

        let export_file = self.dir.path().join(Self::EXPORT_FILE_NAME);
        let mut args = self.args.clone();
        args.extend(
            [
                "json",
                "--show-contexts",
                "--ignore-errors",
                "-q",
                "-o",
                export_file.as_str(),
            ]
            .map(str::to_owned),
        );

        let command: Vec<String> = std::iter::once(self.program.clone())
            .chain(args.iter().cloned())
            .collect();
        debug!("exporting coverage data: {}", shell_words::join(&command));

        let output = cmd(&self.program, &args)
            .dir(self.repo_root.as_std_path())
            .env(Self::DATA_FILE_ENV, data_file.as_std_path())
            .stdout_capture()
            .stderr_capture()
            .unchecked()
            .run()
            .map_err(|error| CoverageError::ExportExec {
                command: command.clone(),
                error,
            })?;

        if !output.status.success() {
            return Err(CoverageError::ExportFailed {
                command,
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let json = std::fs::read_to_string(&export_file).map_err(|error| CoverageError::Read {
            path: export_file.clone(),
            error,
        })?;
        let data = CoverageData::from_coverage_json(&json, &self.repo_root)
            .map_err(|error| CoverageError::Parse {
                path: export_file,
                error,
            })?;
        debug!("exported coverage data for {} files", data.file_count());

        Ok(data)
    }
}
