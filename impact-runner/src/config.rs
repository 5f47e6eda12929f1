// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for test-impact.
//!
//! Configuration is layered with the [`config`] crate: the embedded [`ImpactConfig::DEFAULT_CONFIG`]
//! is read first, followed by the repository's `.config/test-impact.toml` (or a config file passed
//! in explicitly).

use crate::errors::{ConfigParseError, ConfigParseErrorKind};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Overall configuration for test-impact.
///
/// This is the root data structure for test-impact configuration. Most runner-specific
/// configuration is exposed through [`EngineConfig`] and [`CoverageConfig`].
#[derive(Clone, Debug)]
pub struct ImpactConfig {
    repo_root: Utf8PathBuf,
    inner: ImpactConfigImpl,
}

impl ImpactConfig {
    /// The default location of the config within the repository: `.config/test-impact.toml`.
    pub const CONFIG_PATH: &'static str = ".config/test-impact.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// Reads the test-impact config from the given file, or if not specified from
    /// `.config/test-impact.toml` in the given repository root.
    ///
    /// If a config file is specified explicitly, it must exist. Unknown keys are reported as
    /// warnings.
    pub fn from_sources(
        repo_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_impl(repo_root, config_file, |config_file, unknown| {
            warn!(
                "ignoring unknown configuration keys in config file {config_file}: {}",
                itertools::join(unknown, ", ")
            );
        })
    }

    // A custom unknown_callback can be passed in while testing.
    fn from_sources_impl(
        repo_root: impl Into<Utf8PathBuf>,
        config_file: Option<&Utf8Path>,
        mut unknown_callback: impl FnMut(&Utf8Path, &BTreeSet<String>),
    ) -> Result<Self, ConfigParseError> {
        let repo_root = repo_root.into();
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = repo_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (inner, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            unknown_callback(&config_file, &unknown);
        }

        inner
            .validate()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self { repo_root, inner })
    }

    /// Returns the default configuration, without reading any files.
    pub fn default_config(repo_root: impl Into<Utf8PathBuf>) -> Self {
        let config = Self::make_default_config()
            .build()
            .expect("default config is always valid");

        let inner: ImpactConfigImpl = config
            .try_deserialize()
            .expect("default config is always valid");
        Self {
            repo_root: repo_root.into(),
            inner,
        }
    }

    /// Returns the repository root this config was read for.
    pub fn repo_root(&self) -> &Utf8Path {
        &self.repo_root
    }

    /// Returns the configuration for the test engine.
    pub fn engine(&self) -> &EngineConfig {
        &self.inner.engine
    }

    /// Returns the configuration for coverage recording.
    pub fn coverage(&self) -> &CoverageConfig {
        &self.inner.coverage
    }

    // ---
    // Helper methods
    // ---

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    /// This returns a tuple of (config, ignored paths).
    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ImpactConfigImpl, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let mut cb = |path: serde_ignored::Path| {
            ignored.insert(path.to_string());
        };
        let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
        let config: ImpactConfigImpl =
            serde_path_to_error::deserialize(ignored_de).map_err(|error| {
                // The config crate also reports the key. Drop it for consistency with
                // serde_path_to_error's path.
                let path = error.path().clone();
                let error = match error.into_inner() {
                    ConfigError::At { error, .. } => *error,
                    other => other,
                };
                ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
                    path, error,
                )))
            })?;

        Ok((config, ignored))
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ImpactConfigImpl {
    engine: EngineConfig,
    coverage: CoverageConfig,
}

impl ImpactConfigImpl {
    fn validate(&self) -> Result<(), ConfigParseErrorKind> {
        if self.engine.command.is_empty() {
            return Err(ConfigParseErrorKind::EmptyCommand {
                key: "engine.command",
            });
        }
        if self.coverage.command.is_empty() {
            return Err(ConfigParseErrorKind::EmptyCommand {
                key: "coverage.command",
            });
        }
        if self.coverage.context_separator.is_empty() {
            return Err(ConfigParseErrorKind::EmptyContextSeparator);
        }
        Ok(())
    }
}

/// Configuration for invoking the test engine.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
    /// The program and leading arguments used to invoke the engine.
    ///
    /// Guaranteed to be non-empty.
    pub command: Vec<String>,

    /// Arguments passed to every invocation of the engine, before command-line arguments.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl EngineConfig {
    /// Returns the program and the arguments that precede everything else.
    pub fn program_and_args(&self) -> (&str, &[String]) {
        split_command(&self.command)
    }
}

/// Configuration for recording and exporting per-test coverage.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CoverageConfig {
    /// The program and leading arguments used to invoke coverage.py.
    ///
    /// Guaranteed to be non-empty.
    pub command: Vec<String>,

    /// Source paths to measure. Empty means pytest-cov's default.
    #[serde(default)]
    pub source: Vec<String>,

    /// The separator between the test identifier and the suffix of a coverage context label.
    pub context_separator: String,
}

impl CoverageConfig {
    /// Returns the program and the arguments that precede everything else.
    pub fn program_and_args(&self) -> (&str, &[String]) {
        split_command(&self.command)
    }
}

fn split_command(command: &[String]) -> (&str, &[String]) {
    match command.split_first() {
        Some((program, args)) => (program.as_str(), args),
        // validate() rejects empty commands, so this is only reachable through hand-built configs.
        None => ("", &[]),
    }
}
