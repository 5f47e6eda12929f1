// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Prints out and aggregates test execution statuses.
//!
//! The main structure in this module is [`TestReporter`].

use crate::{
    errors::WriteEventError,
    helpers::{plural, write_test_name},
    list::{Styles as ListStyles, TestList},
    outcome::{RawOutcome, TestStatus},
    runner::RunStats,
    selection::SelectionDirective,
};
use impact_metadata::PytestExitCode;
use owo_colors::{OwoColorize, Style};
use std::{
    fmt,
    io::{self, BufWriter, Write},
    time::Duration,
};
use swrite::{SWrite, swrite};

/// A test event.
///
/// Events are produced by an [`ImpactRunner`](crate::runner::ImpactRunner) and consumed by a
/// [`TestReporter`].
#[derive(Clone, Debug)]
pub enum TestEvent<'a> {
    /// Collecting tests failed. No tests will be run.
    CollectionFailed {
        /// The status collection exited with.
        status_code: i32,
    },

    /// The test run started.
    RunStarted {
        /// The list of tests that were collected.
        test_list: &'a TestList,
    },

    /// A test finished, or was skipped.
    TestFinished {
        /// The outcome, with its selection directive applied.
        outcome: &'a RawOutcome,

        /// The selection directive for the test.
        directive: SelectionDirective,
    },

    /// The test run finished.
    RunFinished {
        /// The amount of time it took for the run to complete.
        elapsed: Duration,

        /// Statistics for the run.
        run_stats: &'a RunStats,

        /// The status code the run exits with.
        status_code: i32,
    },
}

/// Where the reporter writes its output.
pub enum ReporterStderr<'a> {
    /// Standard error, buffered per event.
    Terminal,

    /// An in-memory buffer.
    Buffer(&'a mut Vec<u8>),
}

/// Test reporter builder.
#[derive(Debug, Default)]
pub struct TestReporterBuilder {
    colorize: bool,
    verbose: bool,
}

impl TestReporterBuilder {
    /// Sets whether the output is colorized.
    pub fn set_colorize(&mut self, colorize: bool) -> &mut Self {
        self.colorize = colorize;
        self
    }

    /// Sets verbose output: skipped tests and the slowest test are reported too.
    pub fn set_verbose(&mut self, verbose: bool) -> &mut Self {
        self.verbose = verbose;
        self
    }

    /// Creates a new test reporter.
    pub fn build<'a>(&self, output: ReporterStderr<'a>) -> TestReporter<'a> {
        let mut styles = Styles::default();
        if self.colorize {
            styles.colorize();
        }

        TestReporter {
            stderr: output,
            styles,
            verbose: self.verbose,
        }
    }
}

/// Functionality to report test results to stderr.
pub struct TestReporter<'a> {
    stderr: ReporterStderr<'a>,
    styles: Styles,
    verbose: bool,
}

impl<'a> TestReporter<'a> {
    /// Report a test event.
    pub fn report_event(&mut self, event: TestEvent<'_>) -> Result<(), WriteEventError> {
        match &mut self.stderr {
            ReporterStderr::Terminal => {
                let mut writer = BufWriter::new(io::stderr());
                Self::write_event(&self.styles, self.verbose, &event, &mut writer)
                    .and_then(|()| writer.flush())
                    .map_err(WriteEventError::Io)
            }
            ReporterStderr::Buffer(buf) => {
                Self::write_event(&self.styles, self.verbose, &event, buf)
                    .map_err(WriteEventError::Io)
            }
        }
    }

    fn write_event(
        styles: &Styles,
        verbose: bool,
        event: &TestEvent<'_>,
        mut writer: impl Write,
    ) -> io::Result<()> {
        match event {
            TestEvent::CollectionFailed { status_code } => {
                writeln!(
                    writer,
                    "{:>12} collecting tests exited with status {}",
                    "Error".style(styles.fail),
                    status_code.style(styles.count),
                )?;
            }
            TestEvent::RunStarted { test_list } => {
                write!(writer, "{:>12} ", "Starting".style(styles.pass))?;
                write!(
                    writer,
                    "{} {}",
                    test_list.run_count().style(styles.count),
                    plural::tests_str(test_list.run_count()),
                )?;

                let mut extra = Vec::with_capacity(2);
                if test_list.skip_count() > 0 {
                    extra.push(format!(
                        "{} {}",
                        test_list.skip_count().style(styles.count),
                        "skipped".style(styles.skip),
                    ));
                }
                if test_list.expect_failure_count() > 0 {
                    extra.push(format!(
                        "{} {}",
                        test_list.expect_failure_count().style(styles.count),
                        "expected to fail".style(styles.skip),
                    ));
                }
                if !extra.is_empty() {
                    write!(writer, " ({})", extra.join(", "))?;
                }
                writeln!(writer)?;
            }
            TestEvent::TestFinished { outcome, directive } => {
                if outcome.status == TestStatus::Skipped && !verbose {
                    return Ok(());
                }

                let (status_str, style) = styles.for_status(outcome.status);
                write!(writer, "{:>12} ", status_str.style(style))?;
                write!(
                    writer,
                    "{}",
                    DisplayBracketedDuration(outcome.durations.total_secs())
                )?;
                write_test_name(outcome.id.as_str(), &styles.list, &mut writer)?;
                if verbose {
                    if let Some(description) = directive.description() {
                        write!(writer, " ({})", description.style(styles.skip))?;
                    }
                }
                writeln!(writer)?;
            }
            TestEvent::RunFinished {
                elapsed,
                run_stats,
                status_code,
            } => {
                let summary_style = if *status_code == PytestExitCode::OK {
                    styles.pass
                } else {
                    styles.fail
                };
                write!(writer, "------------\n{:>12} ", "Summary".style(summary_style))?;
                write!(
                    writer,
                    "{}",
                    DisplayBracketedDuration(elapsed.as_secs_f64())
                )?;

                let mut summary_str = String::new();
                write_summary_str(run_stats, styles, &mut summary_str);
                writeln!(
                    writer,
                    "{} {} run: {summary_str}",
                    run_stats.finished_count.style(styles.count),
                    plural::tests_str(run_stats.finished_count),
                )?;

                if let (true, Some((id, time_ms))) = (verbose, &run_stats.slowest) {
                    write!(writer, "{:>12} ", "Slowest".style(styles.skip))?;
                    write!(writer, "{}", DisplayBracketedDuration(time_ms / 1000.0))?;
                    write_test_name(id.as_str(), &styles.list, &mut writer)?;
                    writeln!(writer)?;
                }
            }
        }

        Ok(())
    }
}

fn write_summary_str(run_stats: &RunStats, styles: &Styles, out: &mut String) {
    // Written in this style to ensure new fields are accounted for.
    let RunStats {
        collected: _,
        initial_run_count: _,
        finished_count: _,
        passed,
        failed,
        expected_failures,
        unexpected_passes,
        skipped,
        unknown,
        slowest: _,
    } = run_stats;

    swrite!(
        out,
        "{} {}",
        passed.style(styles.count),
        "passed".style(styles.pass)
    );

    if *failed > 0 {
        swrite!(
            out,
            ", {} {}",
            failed.style(styles.count),
            "failed".style(styles.fail),
        );
    }

    if *expected_failures > 0 {
        swrite!(
            out,
            ", {} {}",
            expected_failures.style(styles.count),
            format!("expected {}", plural::failures_str(*expected_failures)).style(styles.skip),
        );
    }

    if *unexpected_passes > 0 {
        swrite!(
            out,
            ", {} {}",
            unexpected_passes.style(styles.count),
            format!("unexpected {}", plural::passes_str(*unexpected_passes)).style(styles.skip),
        );
    }

    if *unknown > 0 {
        swrite!(
            out,
            ", {} {}",
            unknown.style(styles.count),
            "unknown".style(styles.fail),
        );
    }

    swrite!(
        out,
        ", {} {}",
        skipped.style(styles.count),
        "skipped".style(styles.skip),
    );
}

struct DisplayBracketedDuration(f64);

impl fmt::Display for DisplayBracketedDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // * > means right-align.
        // * 8 is the number of characters to pad to.
        // * .3 means print three digits after the decimal point.
        write!(f, "[{:>8.3}s] ", self.0)
    }
}

#[derive(Debug, Default)]
struct Styles {
    count: Style,
    pass: Style,
    fail: Style,
    skip: Style,
    list: ListStyles,
}

impl Styles {
    fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow().bold();
        self.list.colorize();
    }

    fn for_status(&self, status: TestStatus) -> (&'static str, Style) {
        match status {
            TestStatus::Passed => ("PASS", self.pass),
            TestStatus::Failed => ("FAIL", self.fail),
            TestStatus::Error => ("ERROR", self.fail),
            TestStatus::Skipped => ("SKIP", self.skip),
            TestStatus::XFailed => ("XFAIL", self.skip),
            TestStatus::XPassed => ("XPASS", self.skip),
            TestStatus::Unknown => ("UNKNOWN", self.fail),
        }
    }
}
