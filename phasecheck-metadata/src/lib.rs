// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Stable, documented exit codes for [phasecheck](https://crates.io/crates/phasecheck).
//!
//! Scripts that drive phasecheck (for example in CI) can use these constants to tell a failing
//! test case apart from a broken setup.

mod exit_codes;

pub use exit_codes::*;
