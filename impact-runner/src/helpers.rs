// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::list::Styles;
use camino::{Utf8Component, Utf8Path};
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Utilities for pluralizing various words based on count or plurality.
pub(crate) mod plural {
    /// Returns "test" if `count` is 1, otherwise "tests".
    pub(crate) fn tests_str(count: usize) -> &'static str {
        if count == 1 { "test" } else { "tests" }
    }

    /// Returns "failure" if `count` is 1, otherwise "failures".
    pub(crate) fn failures_str(count: usize) -> &'static str {
        if count == 1 { "failure" } else { "failures" }
    }

    /// Returns "pass" if `count` is 1, otherwise "passes".
    pub(crate) fn passes_str(count: usize) -> &'static str {
        if count == 1 { "pass" } else { "passes" }
    }
}

/// Writes a test identifier, styling the part after the last `::` as the test name.
pub(crate) fn write_test_name(name: &str, styles: &Styles, mut writer: impl Write) -> io::Result<()> {
    match name.rsplit_once("::") {
        Some((module_path, trailing)) => {
            write!(
                writer,
                "{}{}{}",
                module_path.style(styles.module_path),
                "::".style(styles.module_path),
                trailing.style(styles.test_name),
            )
        }
        None => write!(writer, "{}", name.style(styles.test_name)),
    }
}

/// Returns `path` relative to `base` with `/` separators, or `None` if `path` isn't within `base`.
///
/// Both paths are compared lexically.
pub(crate) fn rel_path_with_slashes(path: &Utf8Path, base: &Utf8Path) -> Option<String> {
    let rel_path = path.strip_prefix(base).ok()?;
    let mut out = String::with_capacity(rel_path.as_str().len());
    for component in rel_path.components() {
        match component {
            Utf8Component::Normal(part) => {
                if !out.is_empty() {
                    out.push('/');
                }
                out.push_str(part);
            }
            Utf8Component::CurDir => {}
            // A path that climbs out again isn't within base.
            Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_) => {
                return None;
            }
        }
    }
    (!out.is_empty()).then_some(out)
}
