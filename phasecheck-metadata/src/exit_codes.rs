// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `phasecheck` failures.
///
/// `phasecheck` runs may fail for a variety of reasons. This structure documents the exit codes
/// that may occur in case of expected failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum PhasecheckExitCode {}

impl PhasecheckExitCode {
    /// No errors occurred and every test case passed.
    pub const OK: i32 = 0;

    /// A recheck was requested but no failure ledger exists yet. No test cases were run.
    pub const LEDGER_MISSING: i32 = 4;

    /// A user issue happened while setting up a phasecheck invocation, for example an invalid
    /// config file.
    pub const SETUP_ERROR: i32 = 96;

    /// The file named for a single-file run could not be resolved to exactly one test case.
    pub const CASE_RESOLUTION_FAILED: i32 = 97;

    /// One or more test cases failed.
    pub const TEST_RUN_FAILED: i32 = 100;

    /// Writing data to stdout or stderr, or writing the failure ledger, produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
