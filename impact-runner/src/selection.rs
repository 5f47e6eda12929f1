// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deciding, per collected test, whether to run, skip or expect failure.
//!
//! The selection input is a JSON object mapping test identifiers to a boolean "previously passed"
//! signal:
//!
//! * `true`: the test passed last time and is skipped.
//! * `false`: the test failed last time (or its result is unknown). It runs, but a failure doesn't
//!   fail the suite.
//! * absent: the test runs normally.

use crate::{errors::SelectionParseError, list::TestList, outcome::TestStatus};
use impact_metadata::TestId;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// What to do with a single collected test.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SelectionDirective {
    /// Run the test with normal semantics.
    Run,

    /// Don't run the test. Its outcome is always `skipped`.
    Skip,

    /// Run the test, but don't let a failure propagate to the suite.
    ExpectFailure,
}

impl SelectionDirective {
    /// Returns true if a test with this directive is passed to the engine.
    pub fn is_executed(self) -> bool {
        !matches!(self, Self::Skip)
    }

    /// Applies this directive to the status the engine reported for a test.
    pub fn apply(self, status: TestStatus) -> TestStatus {
        match (self, status) {
            (Self::Skip, _) => TestStatus::Skipped,
            (Self::ExpectFailure, TestStatus::Failed | TestStatus::Error) => TestStatus::XFailed,
            (_, status) => status,
        }
    }

    /// Returns a short description of this directive, or `None` for [`Self::Run`].
    pub fn description(self) -> Option<&'static str> {
        match self {
            Self::Run => None,
            Self::Skip => Some("skip"),
            Self::ExpectFailure => Some("expect failure"),
        }
    }
}

impl fmt::Display for SelectionDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description().unwrap_or("run"))
    }
}

/// The parsed selection input.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct SelectionPolicy {
    previous: BTreeMap<TestId, bool>,
}

impl SelectionPolicy {
    /// Parses the selection input.
    ///
    /// The input must be a JSON object whose values are booleans.
    pub fn parse_json(input: &str) -> Result<Self, SelectionParseError> {
        serde_json::from_str(input).map_err(SelectionParseError::new)
    }

    /// Creates a policy from pairs of test identifier and "previously passed".
    pub fn from_previous<I, T>(previous: I) -> Self
    where
        I: IntoIterator<Item = (T, bool)>,
        T: Into<TestId>,
    {
        Self {
            previous: previous
                .into_iter()
                .map(|(id, passed)| (id.into(), passed))
                .collect(),
        }
    }

    /// Returns the directive for the test with the given identifier.
    pub fn directive_for(&self, id: &str) -> SelectionDirective {
        match self.previous.get(id) {
            None => SelectionDirective::Run,
            Some(true) => SelectionDirective::Skip,
            Some(false) => SelectionDirective::ExpectFailure,
        }
    }

    /// Returns the number of tests named by the input.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    /// Returns true if the input doesn't name any tests.
    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }

    /// Returns the identifiers named by the input that weren't collected.
    pub fn unmatched<'a>(&'a self, test_list: &'a TestList) -> impl Iterator<Item = &'a TestId> {
        self.previous
            .keys()
            .filter(move |id| test_list.get(id.as_str()).is_none())
    }
}
