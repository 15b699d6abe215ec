// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test sessions: selecting a set of test cases and sweeping them through the validator.
//!
//! A session is fully described by a [`TestSessionConfig`]. Cases are validated one at a time, in
//! path order, and every failure is recorded in a [`FailureLedger`] that is flushed at the end of
//! the sweep.

use crate::{
    case::TestCase,
    compare::OutputComparator,
    errors::{InvalidIgnorePattern, SessionError},
    invoker::{ArtifactStore, CompilerInvoker},
    ledger::FailureLedger,
    validator::{ArtifactCheck, CaseOutcome, CaseResult, DifferentialValidator, FailureKind},
};
use camino::{Utf8Path, Utf8PathBuf};
use std::{
    collections::BTreeSet,
    io,
    time::{Duration, Instant},
};
use tracing::{debug, warn};

/// Which test cases a session covers.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionMode {
    /// A single test case, relative to the harness root.
    Single(Utf8PathBuf),

    /// Every file in the selected suite directories.
    Batch(BatchSelection),

    /// Exactly the cases recorded in the failure ledger by the previous run.
    Recheck,
}

/// The suite directories covered by a batch session.
///
/// Each combination of folder and subfolder names the directory
/// `<tests_dir>/<suite_prefix><folder>/<subfolder>`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchSelection {
    /// The prefix shared by every suite directory.
    pub suite_prefix: String,

    /// Suffixes appended to the prefix, one per suite.
    pub folders: Vec<String>,

    /// Subfolders within each suite.
    pub subfolders: Vec<String>,
}

impl BatchSelection {
    /// Returns the selected directories under `tests_dir`, in selection order.
    pub fn directories(&self, tests_dir: &Utf8Path) -> Vec<Utf8PathBuf> {
        self.folders
            .iter()
            .flat_map(|folder| {
                let suite_dir = tests_dir.join(format!("{}{folder}", self.suite_prefix));
                self.subfolders
                    .iter()
                    .map(move |subfolder| suite_dir.join(subfolder))
            })
            .collect()
    }
}

/// Everything a session needs to know, resolved ahead of time from config and the command line.
#[derive(Clone, Debug)]
pub struct TestSessionConfig {
    /// Which cases to run.
    pub mode: SessionMode,

    /// The directory that relative paths below are resolved against.
    pub harness_root: Utf8PathBuf,

    /// The directory the compilers run in and write artifacts to.
    pub working_dir: Utf8PathBuf,

    /// The root of the suite directories.
    pub tests_dir: Utf8PathBuf,

    /// The failure ledger file.
    pub ledger_path: Utf8PathBuf,

    /// Lines matching this regex are ignored by the primary comparison. `None` compares every
    /// line.
    pub primary_ignore_pattern: Option<String>,
}

/// Counts of test case outcomes in a session.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunStats {
    /// The number of cases the session selected.
    pub initial_count: usize,

    /// The number of cases validated so far.
    pub finished_count: usize,

    /// Cases that passed.
    pub passed: usize,

    /// Cases that failed the primary comparison.
    pub failed_primary: usize,

    /// Cases whose subject output was missing the artifact section.
    pub failed_subject_internal: usize,

    /// Cases whose artifact lists could not be paired by name.
    pub failed_name_mismatch: usize,

    /// Cases with a mismatched or missing artifact.
    pub failed_artifact: usize,
}

impl RunStats {
    /// Returns the number of failing cases.
    pub fn failed_count(&self) -> usize {
        self.failed_primary
            + self.failed_subject_internal
            + self.failed_name_mismatch
            + self.failed_artifact
    }

    /// Returns true if any case failed.
    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn on_case_finished(&mut self, outcome: &CaseOutcome) {
        self.finished_count += 1;
        match outcome.failure_kind() {
            None => self.passed += 1,
            Some(FailureKind::PrimaryMismatch) => self.failed_primary += 1,
            Some(FailureKind::SubjectInternalError) => self.failed_subject_internal += 1,
            Some(FailureKind::ArtifactNameMismatch) => self.failed_name_mismatch += 1,
            Some(FailureKind::ArtifactMissing | FailureKind::ArtifactContentMismatch) => {
                self.failed_artifact += 1;
            }
        }
    }
}

/// How a session ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SessionOutcome {
    /// Every selected case was validated and the ledger was flushed.
    Completed(RunStats),

    /// A recheck was requested but there is no ledger. No cases were run and nothing was written.
    LedgerMissing {
        /// The ledger path that was looked up.
        path: Utf8PathBuf,
    },
}

/// An event produced while a session runs, consumed by a
/// [`SessionReporter`](crate::reporter::SessionReporter).
#[derive(Clone, Debug)]
#[non_exhaustive]
pub enum SessionEvent<'a> {
    /// The case set was selected and the sweep is about to begin.
    SessionStarted {
        /// The session mode.
        mode: &'a SessionMode,

        /// The number of selected cases.
        case_count: usize,
    },

    /// A batch session moved on to the cases of a new directory.
    DirectoryStarted {
        /// The directory.
        dir: &'a Utf8Path,
    },

    /// A case is about to be validated.
    CaseStarted {
        /// The case.
        case: &'a TestCase,
    },

    /// An artifact pair of the case that was just validated was compared.
    ArtifactChecked {
        /// The case.
        case: &'a TestCase,

        /// The pair and its result.
        check: &'a ArtifactCheck,
    },

    /// A case was validated.
    CaseFinished {
        /// The case.
        case: &'a TestCase,

        /// The validation result.
        result: &'a CaseResult,

        /// How long validation took.
        elapsed: Duration,

        /// Statistics so far, including this case.
        stats: RunStats,
    },

    /// A recheck was requested but no ledger exists.
    LedgerMissing {
        /// The ledger path that was looked up.
        path: &'a Utf8Path,
    },

    /// The sweep finished and the ledger was flushed.
    SessionFinished {
        /// Final statistics.
        stats: RunStats,

        /// How long the session took.
        elapsed: Duration,

        /// Where the failing cases were written.
        ledger_path: &'a Utf8Path,
    },
}

/// A configured test session.
#[derive(Clone, Debug)]
pub struct TestSession {
    config: TestSessionConfig,
    primary: OutputComparator,
}

impl TestSession {
    /// Creates a new session, compiling the primary ignore pattern.
    pub fn new(config: TestSessionConfig) -> Result<Self, InvalidIgnorePattern> {
        let primary = match &config.primary_ignore_pattern {
            Some(pattern) => OutputComparator::with_ignore_pattern(pattern)?,
            None => OutputComparator::new(),
        };
        Ok(Self { config, primary })
    }

    /// Returns the configuration for this session.
    pub fn config(&self) -> &TestSessionConfig {
        &self.config
    }

    /// Returns the absolute path to the failure ledger.
    pub fn ledger_path(&self) -> Utf8PathBuf {
        self.config.harness_root.join(&self.config.ledger_path)
    }

    /// Runs the session, reporting progress through `callback`.
    ///
    /// Case failures are not errors: they are counted in the returned [`RunStats`] and recorded
    /// in the ledger.
    pub async fn run<I, S, F>(
        &self,
        invoker: &I,
        store: &S,
        mut callback: F,
    ) -> Result<SessionOutcome, SessionError>
    where
        I: CompilerInvoker,
        S: ArtifactStore,
        F: FnMut(SessionEvent<'_>) -> io::Result<()>,
    {
        let start = Instant::now();
        let mut ledger = FailureLedger::new(self.ledger_path());
        let report = |err: io::Error| SessionError::Report { err };

        let Some(cases) = self.select_cases(&ledger)? else {
            callback(SessionEvent::LedgerMissing {
                path: ledger.path(),
            })
            .map_err(report)?;
            return Ok(SessionOutcome::LedgerMissing {
                path: ledger.path().to_owned(),
            });
        };

        let mut stats = RunStats {
            initial_count: cases.len(),
            ..RunStats::default()
        };
        callback(SessionEvent::SessionStarted {
            mode: &self.config.mode,
            case_count: cases.len(),
        })
        .map_err(report)?;

        let validator = DifferentialValidator::new(
            invoker,
            store,
            self.config.harness_root.join(&self.config.working_dir),
            self.primary.clone(),
        );
        let group_by_dir = matches!(self.config.mode, SessionMode::Batch(_));
        let mut current_dir = None;

        for case in &cases {
            let dir = case.path().parent();
            if group_by_dir && dir != current_dir {
                current_dir = dir;
                if let Some(dir) = dir {
                    callback(SessionEvent::DirectoryStarted { dir }).map_err(report)?;
                }
            }

            callback(SessionEvent::CaseStarted { case }).map_err(report)?;
            let case_start = Instant::now();
            let result = validator.validate(case).await;
            let elapsed = case_start.elapsed();

            for check in &result.artifact_checks {
                callback(SessionEvent::ArtifactChecked { case, check }).map_err(report)?;
            }

            stats.on_case_finished(&result.outcome);
            if !result.outcome.is_success() {
                ledger.record(case.clone());
            }
            callback(SessionEvent::CaseFinished {
                case,
                result: &result,
                elapsed,
                stats,
            })
            .map_err(report)?;
        }

        // Flushed even with no failures, so stale entries from an earlier run are cleared.
        ledger.flush()?;

        callback(SessionEvent::SessionFinished {
            stats,
            elapsed: start.elapsed(),
            ledger_path: ledger.path(),
        })
        .map_err(report)?;

        Ok(SessionOutcome::Completed(stats))
    }

    /// Returns the cases to run, or `None` if a recheck found no ledger.
    fn select_cases(&self, ledger: &FailureLedger) -> Result<Option<Vec<TestCase>>, SessionError> {
        match &self.config.mode {
            SessionMode::Single(path) => Ok(Some(vec![TestCase::new(path.clone())])),
            SessionMode::Batch(selection) => self.collect_batch(selection).map(Some),
            SessionMode::Recheck => Ok(ledger.load()?),
        }
    }

    fn collect_batch(&self, selection: &BatchSelection) -> Result<Vec<TestCase>, SessionError> {
        let mut cases = BTreeSet::new();

        for dir in selection.directories(&self.config.tests_dir) {
            let abs_dir = self.config.harness_root.join(&dir);
            let entries = match abs_dir.read_dir_utf8() {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    warn!("test directory `{dir}` does not exist, skipping");
                    continue;
                }
                Err(err) => return Err(SessionError::ReadDir { path: abs_dir, err }),
            };

            let read_err = |err: io::Error| SessionError::ReadDir {
                path: abs_dir.clone(),
                err,
            };
            for entry in entries {
                let entry = entry.map_err(read_err)?;
                if entry.file_type().map_err(read_err)?.is_file() {
                    cases.insert(TestCase::new(dir.join(entry.file_name())));
                }
            }
        }

        debug!(count = cases.len(), "collected batch test cases");
        Ok(cases.into_iter().collect())
    }
}
