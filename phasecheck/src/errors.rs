// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use phasecheck_metadata::PhasecheckExitCode;
use phasecheck_runner::errors::{ConfigParseError, InvalidIgnorePattern, SessionError};
use std::{error::Error, path::PathBuf};
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// The #[error()] strings are placeholder messages. Errors are meant to be printed with
// display_to_stderr, which colorizes them.

/// An expected error: a problem with the harness setup or a failing run, rather than a bug in
/// phasecheck.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 { path: PathBuf },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("invalid ignore pattern")]
    InvalidIgnorePattern {
        #[from]
        err: InvalidIgnorePattern,
    },
    #[error("test case not found")]
    CaseNotFound {
        filename: String,
        tests_dir: Utf8PathBuf,
    },
    #[error("test case is ambiguous")]
    AmbiguousCase {
        filename: String,
        first: Utf8PathBuf,
        second: Utf8PathBuf,
    },
    #[error("error searching for test case")]
    CaseSearchError {
        tests_dir: Utf8PathBuf,
        #[source]
        err: walkdir::Error,
    },
    #[error("failed to create async runtime")]
    RuntimeCreateError {
        #[source]
        err: std::io::Error,
    },
    #[error("session error")]
    SessionError {
        #[from]
        err: SessionError,
    },
    #[error("test run failed")]
    TestRunFailed,
}

impl ExpectedError {
    pub(crate) fn test_run_failed() -> Self {
        Self::TestRunFailed
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::InvalidIgnorePattern { .. }
            | Self::RuntimeCreateError { .. } => PhasecheckExitCode::SETUP_ERROR,
            Self::CaseNotFound { .. }
            | Self::AmbiguousCase { .. }
            | Self::CaseSearchError { .. } => PhasecheckExitCode::CASE_RESOLUTION_FAILED,
            Self::SessionError { err } => match err {
                SessionError::ReadDir { .. } | SessionError::LedgerLoad(_) => {
                    PhasecheckExitCode::SETUP_ERROR
                }
                SessionError::LedgerFlush(_) | SessionError::Report { .. } => {
                    PhasecheckExitCode::WRITE_OUTPUT_ERROR
                }
            },
            Self::TestRunFailed => PhasecheckExitCode::TEST_RUN_FAILED,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { path } => {
                error!(
                    "current directory `{}` is not valid UTF-8 (hint: pass --root)",
                    path.display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!("{err}");
                err.source()
            }
            Self::InvalidIgnorePattern { err } => {
                error!(
                    "[compare] ignore-pattern `{}` is not a valid regex",
                    err.pattern().style(styles.bold)
                );
                err.source()
            }
            Self::CaseNotFound {
                filename,
                tests_dir,
            } => {
                error!(
                    "unable to find test case `{}` under {}",
                    filename.style(styles.bold),
                    tests_dir.style(styles.bold),
                );
                None
            }
            Self::AmbiguousCase {
                filename,
                first,
                second,
            } => {
                error!(
                    "multiple test cases named `{}` found; retry with the exact path:\n  {}\n  {}",
                    filename.style(styles.bold),
                    first,
                    second,
                );
                None
            }
            Self::CaseSearchError { tests_dir, err } => {
                error!(
                    "error searching {} for test case",
                    tests_dir.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::RuntimeCreateError { err } => {
                error!("failed to create async runtime");
                Some(err as &dyn Error)
            }
            Self::SessionError { err } => {
                error!("{err}");
                err.source()
            }
            Self::TestRunFailed => {
                error!("test run failed");
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
