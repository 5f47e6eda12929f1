// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    errors::Result,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand, ValueEnum};
use impact_metadata::PytestExitCode;
use impact_runner::{
    config::ImpactConfig,
    engine::{PytestEngine, TestEngine},
    list::{OutputFormat, SerializableFormat, TestList},
    reporter::TestReporterBuilder,
    runner::ImpactRunner,
    selection::SelectionPolicy,
};
use std::io::Write;
use tracing::{debug, warn};

/// Runs a pytest suite and records which source lines each test executes.
///
/// Tests are selected through a JSON object mapping test identifiers to booleans: `true` skips the
/// test, `false` expects it to fail. Tests that aren't mentioned run normally.
#[derive(Debug, Parser)]
#[command(version, name = "test-impact", styles = clap_styles::style())]
pub struct TestImpactApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(flatten)]
    repo_opts: RepoOpts,

    #[command(subcommand)]
    command: Command,
}

impl TestImpactApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the status code to exit with.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        match self.command {
            Command::Run {
                selection,
                message_format,
                engine_args,
            } => {
                // The selection input is validated before anything else is looked at.
                let policy = SelectionPolicy::parse_json(&selection)?;
                let app = App::new(&self.repo_opts, engine_args)?;
                app.exec_run(&policy, message_format.to_output_format(), output, output_writer)
            }
            Command::List {
                selection,
                message_format,
                engine_args,
            } => {
                let policy = match selection {
                    Some(selection) => SelectionPolicy::parse_json(&selection)?,
                    None => SelectionPolicy::default(),
                };
                let app = App::new(&self.repo_opts, engine_args)?;
                app.exec_list(&policy, message_format.to_output_format(), output, output_writer)
            }
        }
    }
}

#[derive(Debug, Args)]
struct RepoOpts {
    /// Repository root [default: current directory]
    #[arg(long, global = true, value_name = "PATH", env = "TEST_IMPACT_REPO_ROOT")]
    repo_root: Option<Utf8PathBuf>,

    /// Config file [default: repo-root/.config/test-impact.toml]
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "TEST_IMPACT_CONFIG_FILE"
    )]
    config_file: Option<Utf8PathBuf>,
}

impl RepoOpts {
    fn repo_root(&self) -> Result<Utf8PathBuf> {
        let path = self.repo_root.as_deref().unwrap_or(Utf8Path::new("."));
        path.canonicalize_utf8()
            .map_err(|err| ExpectedError::repo_root_invalid(path, err))
    }

    fn make_config(&self, repo_root: Utf8PathBuf) -> Result<ImpactConfig> {
        Ok(ImpactConfig::from_sources(
            repo_root,
            self.config_file.as_deref(),
        )?)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run tests, recording per-test coverage
    ///
    /// Exits with the status code of the test engine, after expected failures are accounted for.
    /// Use --message-format json to get the per-test records on stdout. Arguments for the test
    /// engine go after `--`, for example `test-impact run '{}' -- -x tests/`.
    Run {
        /// Selection input: a JSON object mapping test identifiers to booleans
        #[arg(value_name = "SELECTION_JSON")]
        selection: String,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "OUTPUT OPTIONS",
            value_name = "FMT"
        )]
        message_format: MessageFormatOpts,

        /// Arguments passed through verbatim to the test engine, after `--`
        #[arg(last = true, value_name = "ENGINE_ARGS")]
        engine_args: Vec<String>,
    },
    /// List collected tests, along with their selection directives
    List {
        /// Selection input: a JSON object mapping test identifiers to booleans
        #[arg(long, value_name = "SELECTION_JSON")]
        selection: Option<String>,

        /// Output format
        #[arg(
            short = 'T',
            long,
            value_enum,
            default_value_t,
            help_heading = "OUTPUT OPTIONS",
            value_name = "FMT"
        )]
        message_format: MessageFormatOpts,

        /// Arguments passed through verbatim to the test engine, after `--`
        #[arg(last = true, value_name = "ENGINE_ARGS")]
        engine_args: Vec<String>,
    },
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    #[default]
    Human,
    Json,
    JsonPretty,
}

impl MessageFormatOpts {
    fn to_output_format(self) -> OutputFormat {
        match self {
            Self::Human => OutputFormat::Human,
            Self::Json => OutputFormat::Serializable(SerializableFormat::Json),
            Self::JsonPretty => OutputFormat::Serializable(SerializableFormat::JsonPretty),
        }
    }
}

/// State shared by every subcommand once the repository and config are known.
#[derive(Debug)]
struct App {
    config: ImpactConfig,
    engine: PytestEngine,
}

impl App {
    fn new(repo_opts: &RepoOpts, engine_args: Vec<String>) -> Result<Self> {
        let repo_root = repo_opts.repo_root()?;
        debug!("using repository root {repo_root}");
        let config = repo_opts.make_config(repo_root)?;
        let engine = PytestEngine::new(&config, engine_args);

        Ok(Self { config, engine })
    }

    fn exec_run(
        &self,
        policy: &SelectionPolicy,
        format: OutputFormat,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let mut reporter_builder = TestReporterBuilder::default();
        reporter_builder
            .set_colorize(output.color.should_colorize(supports_color::Stream::Stderr))
            .set_verbose(output.verbose);

        let runner = ImpactRunner::new(&self.engine, policy, &self.config);
        let run = {
            let mut reporter = reporter_builder.build(output_writer.reporter_output());
            runner.execute(|event| reporter.report_event(event))?
        };

        if let OutputFormat::Serializable(format) = format {
            let mut writer = output_writer.stdout_writer();
            format
                .to_writer(&run.summary(), &mut writer)
                .map_err(ExpectedError::write_summary_error)?;
            writeln!(writer).map_err(ExpectedError::write_summary_error)?;
            writer.flush().map_err(ExpectedError::write_summary_error)?;
        }

        Ok(run.status_code)
    }

    fn exec_list(
        &self,
        policy: &SelectionPolicy,
        format: OutputFormat,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let collected = self.engine.collect()?;
        if collected.status_code != PytestExitCode::OK {
            warn!(
                "collecting tests exited with status {}",
                collected.status_code
            );
            return Ok(collected.status_code);
        }

        let test_list = TestList::new(collected.test_ids, policy);
        let mut writer = output_writer.stdout_writer();
        test_list.write(
            format,
            &mut writer,
            output.color.should_colorize(supports_color::Stream::Stdout),
        )?;
        if matches!(format, OutputFormat::Serializable(_)) {
            writeln!(writer).map_err(ExpectedError::write_summary_error)?;
        }
        writer.flush().map_err(ExpectedError::write_summary_error)?;

        Ok(PytestExitCode::OK)
    }
}
