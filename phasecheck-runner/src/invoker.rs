// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running compilers and reading what they generate.
//!
//! The validator never spawns processes or touches the filesystem itself. It goes through the
//! [`CompilerInvoker`] and [`ArtifactStore`] traits, which are implemented here for real
//! processes and files, and by in-memory fakes in tests.

use crate::{
    case::TestCase,
    errors::{ArtifactReadError, InvokeError},
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::{fmt, future::Future, io, process::Stdio, time::Duration};
use tokio::process::Command;
use tracing::debug;

/// Identifies which of the two compilers is being run.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompilerId {
    /// The compiler under test.
    Subject,

    /// The trusted reference compiler.
    Reference,
}

impl fmt::Display for CompilerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Subject => f.write_str("subject"),
            Self::Reference => f.write_str("reference"),
        }
    }
}

/// The captured result of running one compiler on one test case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CompilerRun {
    /// Standard output, decoded lossily as UTF-8.
    pub stdout: String,

    /// The exit code, or `None` if the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

/// Runs a compiler on a test case.
///
/// Implementations must capture standard output and must not fail on a non-zero exit status:
/// that is data, recorded in [`CompilerRun::exit_code`].
pub trait CompilerInvoker {
    /// Runs `compiler` on `case`.
    fn run(
        &self,
        compiler: CompilerId,
        case: &TestCase,
    ) -> impl Future<Output = Result<CompilerRun, InvokeError>>;
}

/// A program and its leading arguments. The test case path is appended as the final argument.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub struct CompilerCommand {
    /// The program to run.
    ///
    /// A relative path containing a separator (e.g. `./espressoc`) is resolved against the
    /// working directory the compiler runs in.
    pub program: String,

    /// Arguments passed before the test case path.
    #[serde(default)]
    pub args: Vec<String>,
}

impl CompilerCommand {
    /// Creates a new command with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Adds leading arguments.
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }
}

/// A [`CompilerInvoker`] that spawns real processes.
///
/// Each run captures standard output in memory, so no scratch files are shared between runs.
#[derive(Clone, Debug)]
pub struct ProcessInvoker {
    subject: CompilerCommand,
    reference: CompilerCommand,
    harness_root: Utf8PathBuf,
    working_dir: Utf8PathBuf,
    timeout: Option<Duration>,
}

impl ProcessInvoker {
    /// Creates a new invoker.
    ///
    /// Compilers run with `working_dir` as their current directory. Test case paths are resolved
    /// against `harness_root`, which should be absolute.
    pub fn new(
        subject: CompilerCommand,
        reference: CompilerCommand,
        harness_root: impl Into<Utf8PathBuf>,
        working_dir: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            subject,
            reference,
            harness_root: harness_root.into(),
            working_dir: working_dir.into(),
            timeout: None,
        }
    }

    /// Sets a deadline for each compiler invocation. A compiler still running at the deadline is
    /// killed.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn command(&self, compiler: CompilerId) -> &CompilerCommand {
        match compiler {
            CompilerId::Subject => &self.subject,
            CompilerId::Reference => &self.reference,
        }
    }
}

impl CompilerInvoker for ProcessInvoker {
    async fn run(&self, compiler: CompilerId, case: &TestCase) -> Result<CompilerRun, InvokeError> {
        let command = self.command(compiler);
        let case_path = self.harness_root.join(case.path());
        debug!(
            %compiler,
            program = %command.program,
            case = %case_path,
            "invoking compiler"
        );

        let child = Command::new(&command.program)
            .args(&command.args)
            .arg(&case_path)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| InvokeError::Exec {
                compiler,
                program: command.program.clone(),
                err,
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, wait)
                .await
                .map_err(|_| InvokeError::TimedOut { compiler, timeout })?,
            None => wait.await,
        }
        .map_err(|err| InvokeError::Wait { compiler, err })?;

        debug!(%compiler, status = %output.status, "compiler exited");
        Ok(CompilerRun {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            exit_code: output.status.code(),
        })
    }
}

/// Reads generated artifacts.
pub trait ArtifactStore {
    /// Reads `file_name`, resolved against `working_dir`.
    ///
    /// Returns [`ArtifactReadError::NotFound`] if the file does not exist.
    fn read_artifact(
        &self,
        working_dir: &Utf8Path,
        file_name: &str,
    ) -> Result<Vec<u8>, ArtifactReadError>;
}

/// An [`ArtifactStore`] backed by the filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsArtifactStore;

impl ArtifactStore for FsArtifactStore {
    fn read_artifact(
        &self,
        working_dir: &Utf8Path,
        file_name: &str,
    ) -> Result<Vec<u8>, ArtifactReadError> {
        // An absolute file name replaces working_dir entirely.
        let path = working_dir.join(file_name);
        std::fs::read(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => ArtifactReadError::NotFound { path },
            _ => ArtifactReadError::Io { path, err },
        })
    }
}
