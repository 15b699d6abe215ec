// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Human-readable reporting of session events.

use crate::{
    helpers::{ensure_trailing_newline, format_duration, plural},
    session::{RunStats, SessionEvent, SessionMode},
    validator::{ArtifactFailure, CaseOutcome, CaseResult, ParseFailure, PrimaryFailure},
};
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};

/// Reporter for session events.
#[derive(Debug)]
pub struct SessionReporter {
    styles: Styles,
    verbose: bool,
}

impl SessionReporter {
    /// Creates a new reporter. In verbose mode, failing cases are followed by the diff or output
    /// that explains the failure.
    pub fn new(verbose: bool) -> Self {
        Self {
            styles: Styles::default(),
            verbose,
        }
    }

    /// Colorizes output.
    pub fn colorize(&mut self) {
        self.styles.colorize();
    }

    /// Reports a session event.
    pub fn report_event(
        &mut self,
        event: SessionEvent<'_>,
        mut writer: impl Write,
    ) -> io::Result<()> {
        match event {
            SessionEvent::SessionStarted { mode, case_count } => {
                write!(writer, "{:>12} ", "Starting".style(self.styles.pass))?;
                write!(
                    writer,
                    "{} {}",
                    case_count.style(self.styles.count),
                    plural::cases_str(case_count),
                )?;
                match mode {
                    SessionMode::Single(_) => writeln!(writer)?,
                    SessionMode::Batch(_) => writeln!(writer, " across selected suites")?,
                    SessionMode::Recheck => writeln!(writer, " from failure ledger")?,
                }
            }
            SessionEvent::DirectoryStarted { dir } => {
                writeln!(
                    writer,
                    "{:>12} {}",
                    "Directory".style(self.styles.pass),
                    dir.style(self.styles.bold),
                )?;
            }
            SessionEvent::CaseStarted { case } => {
                if self.verbose {
                    writeln!(
                        writer,
                        "{:>12} {}",
                        "START".style(self.styles.pass),
                        case.display_name().style(self.styles.bold),
                    )?;
                }
            }
            SessionEvent::ArtifactChecked { check, .. } => {
                let status = match &check.failure {
                    None => "VALID".style(self.styles.pass),
                    Some(ArtifactFailure::ContentMismatch { .. }) => {
                        "INVALID".style(self.styles.fail)
                    }
                    Some(
                        ArtifactFailure::Missing { .. } | ArtifactFailure::Unreadable { .. },
                    ) => "MISSING".style(self.styles.fail),
                };
                writeln!(
                    writer,
                    "{:>12} {} against {}",
                    status,
                    check.pair.subject.style(self.styles.bold),
                    check.pair.reference,
                )?;
            }
            SessionEvent::CaseFinished {
                case,
                result,
                elapsed,
                ..
            } => {
                let status = match &result.outcome {
                    CaseOutcome::Passed => "PASS".style(self.styles.pass),
                    outcome if is_error(outcome) => "ERROR".style(self.styles.fail),
                    _ => "FAIL".style(self.styles.fail),
                };
                write!(
                    writer,
                    "{:>12} [{:>8}] {}",
                    status,
                    format_duration(elapsed),
                    case.display_name().style(self.styles.bold),
                )?;
                match failure_reason(&result.outcome) {
                    Some(reason) => writeln!(writer, ": {reason}")?,
                    None => writeln!(writer)?,
                }

                if self.verbose {
                    self.write_failure_details(result, &mut writer)?;
                }
            }
            SessionEvent::LedgerMissing { path } => {
                write!(writer, "{:>12} ", "Missing".style(self.styles.warning))?;
                writeln!(
                    writer,
                    "no failure ledger at {}: run without --recheck first",
                    path.style(self.styles.bold),
                )?;
            }
            SessionEvent::SessionFinished {
                stats,
                elapsed,
                ledger_path,
            } => {
                writeln!(writer, "{}", "------------".style(self.styles.pass))?;
                let summary_style = if stats.has_failures() {
                    self.styles.fail
                } else {
                    self.styles.pass
                };
                write!(
                    writer,
                    "{:>12} [{:>8}] ",
                    "Summary".style(summary_style),
                    format_duration(elapsed),
                )?;
                self.write_summary_stats(&stats, &mut writer)?;
                if stats.has_failures() {
                    writeln!(
                        writer,
                        "; failures written to {}",
                        ledger_path.style(self.styles.bold),
                    )?;
                } else {
                    writeln!(writer)?;
                }
            }
        }

        Ok(())
    }

    fn write_summary_stats(&self, stats: &RunStats, mut writer: impl Write) -> io::Result<()> {
        write!(
            writer,
            "{} {} run: {} {}",
            stats.finished_count.style(self.styles.count),
            plural::cases_str(stats.finished_count),
            stats.passed.style(self.styles.count),
            "passed".style(self.styles.pass),
        )?;

        let failures = [
            (stats.failed_primary, "output mismatch"),
            (stats.failed_subject_internal, "error in subject output"),
            (stats.failed_name_mismatch, "name mismatch"),
            (stats.failed_artifact, "artifact mismatch"),
        ];
        for (count, label) in failures {
            if count > 0 {
                write!(
                    writer,
                    ", {} {}",
                    count.style(self.styles.count),
                    label.style(self.styles.fail),
                )?;
            }
        }
        Ok(())
    }

    fn write_failure_details(&self, result: &CaseResult, mut writer: impl Write) -> io::Result<()> {
        match &result.outcome {
            CaseOutcome::Passed => {}
            CaseOutcome::FailedPrimary(PrimaryFailure::OutputDiffers { diff }) => {
                self.write_section("OUTPUT DIFF", diff, &mut writer)?;
            }
            CaseOutcome::FailedPrimary(PrimaryFailure::TimedOut { .. }) => {}
            CaseOutcome::FailedPrimary(PrimaryFailure::ExecFailed { message, .. }) => {
                writeln!(writer, "    {message}")?;
            }
            CaseOutcome::FailedParse(ParseFailure::SubjectInternalError {
                error,
                subject_output,
                ..
            }) => {
                writeln!(writer, "    {error}")?;
                self.write_section("SUBJECT OUTPUT", subject_output, &mut writer)?;
            }
            CaseOutcome::FailedParse(failure) => {
                writeln!(writer, "    {failure}")?;
            }
            CaseOutcome::FailedArtifact { pair, failure } => match failure {
                ArtifactFailure::ContentMismatch { diff } => {
                    let heading = format!("ARTIFACT DIFF: {}", pair.subject);
                    self.write_section(&heading, diff, &mut writer)?;
                }
                ArtifactFailure::Missing { compiler, path } => {
                    writeln!(writer, "    {compiler} compiler did not generate `{path}`")?;
                }
                ArtifactFailure::Unreadable { message, .. } => {
                    writeln!(writer, "    {message}")?;
                }
            },
        }
        Ok(())
    }

    fn write_section(&self, heading: &str, body: &str, mut writer: impl Write) -> io::Result<()> {
        writeln!(writer)?;
        writeln!(
            writer,
            "{}",
            format!("--- {heading} ---").style(self.styles.section)
        )?;
        write!(writer, "{}", ensure_trailing_newline(body))?;
        writeln!(writer)
    }
}

/// Returns true if the outcome reflects a compiler that misbehaved rather than a disagreement.
fn is_error(outcome: &CaseOutcome) -> bool {
    matches!(
        outcome,
        CaseOutcome::FailedPrimary(
            PrimaryFailure::TimedOut { .. } | PrimaryFailure::ExecFailed { .. }
        ) | CaseOutcome::FailedParse(ParseFailure::SubjectInternalError { .. })
    )
}

fn failure_reason(outcome: &CaseOutcome) -> Option<String> {
    match outcome {
        CaseOutcome::FailedPrimary(PrimaryFailure::TimedOut { compiler, timeout }) => Some(format!(
            "{compiler} compiler timed out after {}",
            humantime::format_duration(*timeout)
        )),
        CaseOutcome::FailedPrimary(PrimaryFailure::ExecFailed { compiler, .. }) => {
            Some(format!("failed to run {compiler} compiler"))
        }
        other => other.failure_kind().map(|kind| kind.to_string()),
    }
}

#[derive(Debug, Default)]
struct Styles {
    bold: Style,
    count: Style,
    pass: Style,
    fail: Style,
    warning: Style,
    section: Style,
}

impl Styles {
    fn colorize(&mut self) {
        self.bold = Style::new().bold();
        self.count = Style::new().bold();
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.warning = Style::new().yellow().bold();
        self.section = Style::new().cyan();
    }
}
