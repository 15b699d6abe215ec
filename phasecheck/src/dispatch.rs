// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line parsing and command execution.

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter},
    resolve::resolve_case,
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use phasecheck_metadata::PhasecheckExitCode;
use phasecheck_runner::{
    config::{PhasecheckConfig, SubfolderSelection, SuiteSelection},
    invoker::{FsArtifactStore, ProcessInvoker},
    reporter::SessionReporter,
    session::{SessionMode, SessionOutcome, TestSession, TestSessionConfig},
};
use std::{io::Write, time::Duration};
use tracing::debug;

/// Differential testing of a student compiler against a reference compiler.
///
/// Each test case is compiled by both compilers. A case passes if they print the same output
/// (ignoring lines that embed file paths) and generate identical files. Failing cases are written
/// to a ledger and can be rerun with `multiple --recheck`.
#[derive(Debug, Parser)]
#[command(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct PhasecheckApp {
    #[clap(flatten)]
    output: OutputOpts,

    /// Harness root containing projects, tests and the failure ledger [default: current directory]
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<Utf8PathBuf>,

    /// Config file [default: <root>/.config/phasecheck.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Deadline for each compiler invocation, e.g. "30s" [default: from config, or none]
    #[arg(long, global = true, value_name = "DURATION", value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// The compiler phase under test
    phase: u32,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a single test case, showing full output on failure
    Single {
        /// File name of the test case, or its path relative to the harness root
        filename: String,
    },
    /// Run every test case in the selected suites
    Multiple(MultipleOpts),
}

#[derive(Debug, Args)]
struct MultipleOpts {
    /// Rerun only the test cases that failed last time
    #[arg(short, long, conflicts_with_all = ["plus", "star", "all", "bad", "good"])]
    recheck: bool,

    /// Run the plus suites
    #[arg(short, long, group = "suites")]
    plus: bool,

    /// Run the star suites
    #[arg(short, long, group = "suites")]
    star: bool,

    /// Run every suite
    #[arg(short, long, group = "suites")]
    all: bool,

    /// Run programs that should be rejected
    #[arg(short, long, group = "subfolders")]
    bad: bool,

    /// Run programs that should compile [default]
    #[arg(short, long, group = "subfolders")]
    good: bool,
}

impl MultipleOpts {
    fn mode(&self, config: &PhasecheckConfig) -> SessionMode {
        if self.recheck {
            return SessionMode::Recheck;
        }

        let suites = if self.plus {
            SuiteSelection::Plus
        } else if self.star {
            SuiteSelection::Star
        } else if self.all {
            SuiteSelection::All
        } else {
            SuiteSelection::Default
        };
        let subfolders = if self.bad {
            SubfolderSelection::Bad
        } else {
            SubfolderSelection::Good
        };
        SessionMode::Batch(config.batch_selection(suites, subfolders))
    }
}

impl PhasecheckApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app.
    ///
    /// Returns the exit code.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let harness_root = self.harness_root()?;
        let config = PhasecheckConfig::from_sources(&harness_root, self.config_file.as_deref())?;

        let working_dir = config.layout.project_dir(self.phase);
        let tests_dir = config.layout.tests_dir(self.phase);
        // Single runs always explain failures.
        let verbose = output.verbose || matches!(self.command, Command::Single { .. });

        let mode = match &self.command {
            Command::Single { filename } => {
                SessionMode::Single(resolve_case(&harness_root, &tests_dir, filename)?)
            }
            Command::Multiple(opts) => opts.mode(&config),
        };
        debug!(?mode, %harness_root, phase = self.phase, "resolved session");

        let session = TestSession::new(TestSessionConfig {
            mode,
            harness_root: harness_root.clone(),
            working_dir: working_dir.clone(),
            tests_dir,
            ledger_path: config.ledger.path.clone(),
            primary_ignore_pattern: Some(config.compare.ignore_pattern.clone()),
        })?;
        let invoker = ProcessInvoker::new(
            config.compilers.subject.clone(),
            config.compilers.reference.clone(),
            harness_root.clone(),
            harness_root.join(&working_dir),
        )
        .with_timeout(self.timeout.or(config.run.timeout));

        let mut reporter = SessionReporter::new(verbose);
        if output.color.should_colorize(supports_color::Stream::Stderr) {
            reporter.colorize();
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| ExpectedError::RuntimeCreateError { err })?;

        let mut writer = output_writer.stderr_writer();
        let outcome = runtime.block_on(session.run(&invoker, &FsArtifactStore, |event| {
            reporter.report_event(event, &mut writer)?;
            writer.flush()
        }))?;

        match outcome {
            SessionOutcome::Completed(stats) if stats.has_failures() => {
                Err(ExpectedError::test_run_failed())
            }
            SessionOutcome::Completed(_) => Ok(PhasecheckExitCode::OK),
            SessionOutcome::LedgerMissing { .. } => Ok(PhasecheckExitCode::LEDGER_MISSING),
        }
    }

    fn harness_root(&self) -> Result<Utf8PathBuf> {
        let current_dir =
            std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
        let current_dir = Utf8PathBuf::try_from(current_dir)
            .map_err(|err| ExpectedError::CurrentDirInvalidUtf8 {
                path: err.into_path_buf(),
            })?;
        // Compilers run in the project directory, so the root must be absolute.
        Ok(match &self.root {
            Some(root) => current_dir.join(root),
            None => current_dir,
        })
    }
}
