// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by phasecheck.
//!
//! Note that test case failures are *not* errors: they are reported as
//! [`CaseOutcome`](crate::validator::CaseOutcome) values. The types here describe problems with
//! the harness itself (config, I/O, process spawning).

use crate::invoker::CompilerId;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::{io, time::Duration};
use thiserror::Error;

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse phasecheck config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An ignore pattern passed to an [`OutputComparator`](crate::compare::OutputComparator) was not
/// a valid regular expression.
#[derive(Debug, Error)]
#[error("invalid ignore pattern `{pattern}`")]
pub struct InvalidIgnorePattern {
    pattern: String,
    #[source]
    err: regex::Error,
}

impl InvalidIgnorePattern {
    pub(crate) fn new(pattern: impl Into<String>, err: regex::Error) -> Self {
        Self {
            pattern: pattern.into(),
            err,
        }
    }

    /// Returns the pattern that failed to compile.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }
}

/// The artifact metadata section could not be located in a compiler's output.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum SectionError {
    /// The output had fewer dash-separated sections than required.
    #[error("missing section: expected at least {expected} dash-separated sections, found {found}")]
    MissingSection {
        /// The number of sections required.
        expected: usize,

        /// The number of sections actually found.
        found: usize,
    },
}

/// An error that occurred while invoking a compiler.
///
/// A non-zero exit status is *not* an invocation error: it is recorded in the
/// [`CompilerRun`](crate::invoker::CompilerRun).
#[derive(Debug, Error)]
pub enum InvokeError {
    /// The compiler process could not be started.
    #[error("failed to execute {compiler} compiler `{program}`")]
    Exec {
        /// The compiler that was being invoked.
        compiler: CompilerId,

        /// The program that was being executed.
        program: String,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Waiting on the compiler process failed.
    #[error("failed to wait on {compiler} compiler")]
    Wait {
        /// The compiler that was being invoked.
        compiler: CompilerId,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The compiler did not finish within the configured deadline and was killed.
    #[error("{compiler} compiler timed out after {}", humantime::format_duration(*.timeout))]
    TimedOut {
        /// The compiler that was being invoked.
        compiler: CompilerId,

        /// The deadline that was exceeded.
        timeout: Duration,
    },
}

/// An error that occurred while reading a generated artifact.
#[derive(Debug, Error)]
pub enum ArtifactReadError {
    /// The compiler reported generating a file that does not exist.
    #[error("artifact `{path}` not found")]
    NotFound {
        /// The path that was looked up.
        path: Utf8PathBuf,
    },

    /// The file exists but could not be read.
    #[error("failed to read artifact `{path}`")]
    Io {
        /// The path that failed to be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },
}

/// Errors that can occur when loading the failure ledger.
#[derive(Debug, Error)]
pub enum LedgerLoadError {
    /// Error reading the ledger file.
    #[error("failed to read failure ledger at `{path}`")]
    Read {
        /// The path that failed to be read.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },
}

/// Errors that can occur when flushing the failure ledger.
#[derive(Debug, Error)]
pub enum LedgerFlushError {
    /// Error creating the ledger's parent directory.
    #[error("failed to create directory `{path}`")]
    CreateDir {
        /// The directory path that failed to be created.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// Error writing the ledger to disk.
    #[error("failed to write failure ledger to `{path}`")]
    Write {
        /// The path that failed to be written.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: atomicwrites::Error<io::Error>,
    },
}

/// An error that aborted a test session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A batch directory exists but could not be listed.
    #[error("failed to list test directory `{path}`")]
    ReadDir {
        /// The directory that failed to be listed.
        path: Utf8PathBuf,

        /// The underlying error.
        #[source]
        err: io::Error,
    },

    /// The failure ledger could not be read for a recheck.
    #[error(transparent)]
    LedgerLoad(#[from] LedgerLoadError),

    /// The failure ledger could not be written at the end of the session.
    #[error(transparent)]
    LedgerFlush(#[from] LedgerFlushError),

    /// The event callback failed to write a report.
    #[error("error reporting session event")]
    Report {
        /// The underlying error.
        #[source]
        err: io::Error,
    },
}
