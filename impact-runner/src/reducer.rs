// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reduces raw coverage contexts into the set of scopes each test touched.

use crate::{coverage::CoverageData, helpers::rel_path_with_slashes};
use camino::Utf8Path;
use impact_metadata::{Scope, TestId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// The scopes touched by each test, keyed by test identifier.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestScopes {
    by_test: BTreeMap<TestId, BTreeSet<Scope>>,
}

impl TestScopes {
    /// Returns the scopes touched by the given test, if any were recorded.
    pub fn get(&self, id: &str) -> Option<&BTreeSet<Scope>> {
        self.by_test.get(id)
    }

    /// Iterates over tests and the scopes they touched, ordered by test identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&TestId, &BTreeSet<Scope>)> + '_ {
        self.by_test.iter()
    }

    /// Returns the number of tests with at least one recorded scope.
    pub fn len(&self) -> usize {
        self.by_test.len()
    }

    /// Returns true if no scopes were recorded for any test.
    pub fn is_empty(&self) -> bool {
        self.by_test.is_empty()
    }
}

/// Turns line-level coverage contexts into per-test scope sets.
#[derive(Clone, Debug)]
pub struct ContextReducer<'a> {
    repo_root: &'a Utf8Path,
    separator: &'a str,
}

impl<'a> ContextReducer<'a> {
    /// Creates a new reducer.
    ///
    /// `repo_root` must be canonical: files are matched against it lexically. `separator` splits
    /// a context label into the test identifier and a phase suffix.
    pub fn new(repo_root: &'a Utf8Path, separator: &'a str) -> Self {
        Self {
            repo_root,
            separator,
        }
    }

    /// Reduces the given coverage data.
    ///
    /// Files outside the repository root are skipped. Empty labels and labels without a
    /// separator don't belong to any test and are skipped too.
    pub fn reduce(&self, data: &CoverageData) -> TestScopes {
        let mut by_test: BTreeMap<TestId, BTreeSet<Scope>> = BTreeMap::new();

        for (file, lines) in data.iter() {
            let Some(rel_path) = rel_path_with_slashes(file, self.repo_root) else {
                debug!("skipping coverage for {file}: outside repository root");
                continue;
            };

            for (&line, labels) in lines {
                for label in labels {
                    let Some(test_id) = self.test_id_for(label) else {
                        continue;
                    };
                    let scope = Scope::line(rel_path.clone(), line);
                    match by_test.get_mut(test_id) {
                        Some(scopes) => {
                            scopes.insert(scope);
                        }
                        None => {
                            by_test.insert(TestId::new(test_id), BTreeSet::from([scope]));
                        }
                    }
                }
            }
        }

        TestScopes { by_test }
    }

    /// Extracts the test identifier from a context label: everything before the last separator.
    ///
    /// Returns `None` for labels that don't name a test.
    pub fn test_id_for<'l>(&self, label: &'l str) -> Option<&'l str> {
        if label.is_empty() {
            return None;
        }
        match label.rsplit_once(self.separator) {
            Some(("", _)) => None,
            Some((test_id, _)) => Some(test_id),
            None => {
                debug!("ignoring coverage context `{label}`: no `{}` separator", self.separator);
                None
            }
        }
    }
}
