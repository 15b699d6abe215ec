// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test case identifiers.

use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;

/// One input program fed to both compilers.
///
/// The path is relative to the harness root (or absolute). Test cases are ordered by path, which
/// is the order batch sessions iterate in.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TestCase {
    path: Utf8PathBuf,
    display_name: String,
}

impl TestCase {
    /// Creates a new test case for the given path.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let display_name = path.file_name().unwrap_or(path.as_str()).to_owned();
        Self { path, display_name }
    }

    /// Parses a single line of a failure ledger.
    ///
    /// Returns `None` for blank or whitespace-only lines.
    pub fn from_ledger_line(line: &str) -> Option<Self> {
        let line = line.trim();
        (!line.is_empty()).then(|| Self::new(line))
    }

    /// Returns the path to this test case.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns the name shown in reports: the final component of the path.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl fmt::Display for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path)
    }
}
