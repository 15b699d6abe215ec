// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Differential testing of a student compiler against a reference compiler.
//!
//! This crate is the command-line front end. The validation logic lives in `phasecheck-runner`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;
mod resolve;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{OutputContext, OutputWriter};
