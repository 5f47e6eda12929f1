// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{borrow::Borrow, fmt};

/// A stable identifier for a single test invocation.
///
/// For pytest, this is the node ID, for example `tests/test_foo.py::test_bar[1-2]`. The same
/// identifier is used as the key of the selection input, as the prefix of coverage context labels,
/// and as the name of emitted records.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TestId(SmolStr);

impl TestId {
    /// Creates a new `TestId`.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    /// Returns the identifier as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for TestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for TestId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl Borrow<str> for TestId {
    fn borrow(&self) -> &str {
        self.as_str()
    }
}

impl From<&str> for TestId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for TestId {
    fn from(s: String) -> Self {
        Self(SmolStr::from(s))
    }
}

/// A located region of source code.
///
/// Scopes compare, hash and order by every field, in declaration order, so they can be used as
/// members of sets keyed by test.
///
/// Scopes derived from coverage data always have `path`, `startline` and `endline` set. Absent
/// fields are omitted when serialized.
#[derive(Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct Scope {
    /// The path of the file, relative to the repository root and separated by `/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// The name of the enclosing function, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub func_name: Option<String>,

    /// The raw filesystem path of the file, if distinct from `path`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,

    /// The first line of the region, 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startline: Option<u32>,

    /// The first column of the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startcol: Option<u32>,

    /// The last line of the region, 1-based and inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endline: Option<u32>,

    /// The last column of the region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endcol: Option<u32>,
}

impl Scope {
    /// Creates a scope covering a single line of the file at `path`.
    pub fn line(path: impl Into<String>, line: u32) -> Self {
        Self {
            path: Some(path.into()),
            startline: Some(line),
            endline: Some(line),
            ..Self::default()
        }
    }
}

/// The normalized result of a single test that ran to a final result.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestResultRecord {
    /// The identifier of the test.
    pub name: TestId,

    /// True if the test passed.
    pub success: bool,

    /// Time spent in setup, call and teardown, in milliseconds.
    pub time_in_ms: f64,

    /// The scopes executed while the test was active.
    ///
    /// Sorted by the ordering of [`Scope`].
    pub call_graph: Vec<Scope>,
}

/// The machine-readable summary of a `test-impact run` invocation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RunSummary {
    /// The status code the run exits with.
    ///
    /// Cross-reference with [`PytestExitCode`](crate::PytestExitCode).
    pub status_code: i32,

    /// One record per test that ran to a final result, in collection order.
    pub tests: Vec<TestResultRecord>,
}

impl RunSummary {
    /// Parses a summary from the JSON produced by `test-impact run --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Iterates over the records for tests that failed.
    pub fn failed_tests(&self) -> impl Iterator<Item = &TestResultRecord> + '_ {
        self.tests.iter().filter(|record| !record.success)
    }

    /// Returns the record for the given test, if it ran.
    pub fn get(&self, name: &str) -> Option<&TestResultRecord> {
        self.tests.iter().find(|record| record.name.as_str() == name)
    }
}
