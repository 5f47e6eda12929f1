// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [test-impact](https://crates.io/crates/test-impact).
//!
//! The basic flow of a run is:
//!
//! 1. parse a [`SelectionPolicy`](selection::SelectionPolicy) from the selection input;
//! 2. collect tests through a [`TestEngine`](engine::TestEngine) into a
//!    [`TestList`](list::TestList), annotating each test with its directive;
//! 3. run the tests inside a [`CoverageSession`](coverage::CoverageSession);
//! 4. reduce the recorded coverage contexts into per-test scopes, and
//!    [aggregate](aggregator::aggregate) them with the outcomes into result records.
//!
//! [`ImpactRunner`](runner::ImpactRunner) drives all of these steps.

pub mod aggregator;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod errors;
mod helpers;
pub mod list;
pub mod outcome;
pub mod reducer;
pub mod reporter;
pub mod runner;
pub mod selection;
mod stopwatch;
