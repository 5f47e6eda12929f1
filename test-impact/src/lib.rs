// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runs a pytest suite and records, for every test, the source lines it executed.
//!
//! `test-impact run <SELECTION_JSON>` collects tests, applies the selection input (skip or expect
//! failure per test), runs the suite with per-test coverage contexts, and produces one record per
//! test with its outcome, duration and call graph. Use `--message-format json` to write the
//! records to stdout.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter, StderrStyles};
