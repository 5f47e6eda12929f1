// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for building and querying the list of collected tests.
//!
//! The main data structure in this module is [`TestList`]: every test the engine collected, in
//! collection order, annotated with its [`SelectionDirective`](crate::selection::SelectionDirective).

mod output_format;
mod test_list;

pub use output_format::*;
pub use test_list::*;
