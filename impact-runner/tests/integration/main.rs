// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests that drive [`ImpactRunner`](impact_runner::runner::ImpactRunner) through a
//! scripted engine.

mod basic;
mod fixtures;
