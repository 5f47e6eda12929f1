// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::WriteTestListError,
    helpers::write_test_name,
    list::{OutputFormat, Styles},
    selection::{SelectionDirective, SelectionPolicy},
};
use impact_metadata::TestId;
use indexmap::IndexMap;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::io::{self, Write};
use tracing::debug;

/// List of tests collected by the engine, in collection order.
///
/// Every test is annotated with the [`SelectionDirective`] the selection policy decided for it.
/// The list is never reordered, and no collected test is ever dropped from it.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestList {
    test_count: usize,
    tests: IndexMap<TestId, TestInfo>,
    #[serde(skip)]
    skip_count: usize,
    #[serde(skip)]
    expect_failure_count: usize,
}

/// Information about a single collected test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestInfo {
    /// The directive decided for this test.
    pub directive: SelectionDirective,
}

/// A single collected test, as returned by [`TestList::iter_tests`].
#[derive(Copy, Clone, Debug)]
pub struct TestInstance<'a> {
    /// The identifier of the test.
    pub id: &'a TestId,

    /// Information about the test.
    pub info: &'a TestInfo,
}

impl TestList {
    /// Creates a new test list from collected identifiers, applying the selection policy to each.
    ///
    /// If an identifier was collected more than once, only its first occurrence is kept.
    pub fn new(test_ids: impl IntoIterator<Item = TestId>, policy: &SelectionPolicy) -> Self {
        let mut tests = IndexMap::new();
        for id in test_ids {
            if tests.contains_key(&id) {
                debug!("test `{id}` collected more than once, ignoring duplicate");
                continue;
            }
            let directive = policy.directive_for(id.as_str());
            tests.insert(id, TestInfo { directive });
        }

        let count_of = |wanted: SelectionDirective| {
            tests
                .values()
                .filter(|info: &&TestInfo| info.directive == wanted)
                .count()
        };
        let skip_count = count_of(SelectionDirective::Skip);
        let expect_failure_count = count_of(SelectionDirective::ExpectFailure);

        Self {
            test_count: tests.len(),
            tests,
            skip_count,
            expect_failure_count,
        }
    }

    /// Returns the total number of collected tests.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    /// Returns the number of tests that are passed to the engine.
    pub fn run_count(&self) -> usize {
        self.test_count - self.skip_count
    }

    /// Returns the number of tests that are skipped.
    pub fn skip_count(&self) -> usize {
        self.skip_count
    }

    /// Returns the number of tests that run with a failure expected.
    pub fn expect_failure_count(&self) -> usize {
        self.expect_failure_count
    }

    /// Looks up a collected test by identifier.
    pub fn get(&self, id: &str) -> Option<&TestInfo> {
        self.tests.get(id)
    }

    /// Returns the directive for the given test, treating tests that weren't collected as
    /// [`SelectionDirective::Run`].
    pub fn directive_for(&self, id: &str) -> SelectionDirective {
        self.get(id)
            .map_or(SelectionDirective::Run, |info| info.directive)
    }

    /// Iterates over the collected tests in collection order.
    pub fn iter_tests(&self) -> impl Iterator<Item = TestInstance<'_>> + '_ {
        self.tests
            .iter()
            .map(|(id, info)| TestInstance { id, info })
    }

    /// Iterates over the tests that are skipped, in collection order.
    pub fn iter_skipped(&self) -> impl Iterator<Item = &TestId> + '_ {
        self.iter_tests()
            .filter(|test| !test.info.directive.is_executed())
            .map(|test| test.id)
    }

    /// Outputs this list to the given writer.
    pub fn write(
        &self,
        output_format: OutputFormat,
        writer: impl Write,
        colorize: bool,
    ) -> Result<(), WriteTestListError> {
        match output_format {
            OutputFormat::Human => self
                .write_human(writer, colorize)
                .map_err(WriteTestListError::Io),
            OutputFormat::Serializable(format) => format
                .to_writer(self, writer)
                .map_err(WriteTestListError::Json),
        }
    }

    /// Outputs this list as a string with the given format.
    pub fn to_string(&self, output_format: OutputFormat) -> Result<String, WriteTestListError> {
        let mut buf = Vec::with_capacity(1024);
        self.write(output_format, &mut buf, false)?;
        Ok(String::from_utf8(buf).expect("buffer is valid UTF-8"))
    }

    // ---
    // Helper methods
    // ---

    fn write_human(&self, mut writer: impl Write, colorize: bool) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        if self.tests.is_empty() {
            return writeln!(writer, "(no tests)");
        }

        for test in self.iter_tests() {
            write_test_name(test.id.as_str(), &styles, &mut writer)?;
            if let Some(description) = test.info.directive.description() {
                write!(writer, " ({})", description.style(styles.directive))?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }
}
