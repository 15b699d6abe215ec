// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
#[cfg(unix)]
mod process;
mod session;
