// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage and retrieval of failing test cases between runs.
//!
//! The ledger is a plain text file with one test case path per line and no header. Each flush
//! replaces the file wholesale, so after a recheck the ledger holds exactly the cases that still
//! fail.

use crate::{
    case::TestCase,
    errors::{LedgerFlushError, LedgerLoadError},
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use std::{fs, io, io::Write};
use tracing::debug;

/// The failing test cases of the current run, and the file they are persisted to.
#[derive(Clone, Debug)]
pub struct FailureLedger {
    path: Utf8PathBuf,
    entries: Vec<TestCase>,
}

impl FailureLedger {
    /// The default ledger file name, relative to the harness root.
    pub const DEFAULT_PATH: &'static str = "failed.txt";

    /// Creates an empty ledger persisted at `path`.
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Returns the path the ledger is persisted to.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends a failing test case.
    pub fn record(&mut self, case: TestCase) {
        self.entries.push(case);
    }

    /// Returns the failing test cases recorded so far, in the order they were recorded.
    pub fn entries(&self) -> &[TestCase] {
        &self.entries
    }

    /// Returns the number of failing test cases recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no failing test cases have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads the persisted ledger.
    ///
    /// Returns `Ok(None)` if no ledger has been written yet. Blank lines are skipped.
    pub fn load(&self) -> Result<Option<Vec<TestCase>>, LedgerLoadError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let cases: Vec<_> = contents
                    .lines()
                    .filter_map(TestCase::from_ledger_line)
                    .collect();
                debug!(path = %self.path, count = cases.len(), "loaded failure ledger");
                Ok(Some(cases))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LedgerLoadError::Read {
                path: self.path.clone(),
                err,
            }),
        }
    }

    /// Writes the recorded test cases to disk, replacing any previous ledger.
    ///
    /// An empty ledger is written as an empty file, which clears stale entries from earlier runs.
    pub fn flush(&self) -> Result<(), LedgerFlushError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| LedgerFlushError::CreateDir {
                path: parent.to_owned(),
                err,
            })?;
        }

        let file = AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite);
        file.write(|f| {
            for case in &self.entries {
                writeln!(f, "{}", case.path())?;
            }
            Ok::<_, io::Error>(())
        })
        .map_err(|err| LedgerFlushError::Write {
            path: self.path.clone(),
            err,
        })?;

        debug!(path = %self.path, count = self.entries.len(), "flushed failure ledger");
        Ok(())
    }
}
