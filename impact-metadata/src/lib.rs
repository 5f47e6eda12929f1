// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to `test-impact` machine-readable output.
//!
//! `test-impact run --message-format json` writes a [`RunSummary`]: one [`TestResultRecord`] per
//! test that ran, each carrying the set of [`Scope`]s that were executed while that test was
//! active. Downstream tools use these records to decide which tests a code change affects.

mod exit_codes;
mod records;

pub use exit_codes::*;
pub use records::*;
