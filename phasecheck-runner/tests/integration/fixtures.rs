// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use camino_tempfile::Utf8TempDir;
use camino_tempfile_ext::prelude::*;
use phasecheck_runner::{
    case::TestCase,
    compare::OutputComparator,
    errors::{ArtifactReadError, InvokeError},
    invoker::{ArtifactStore, CompilerId, CompilerInvoker, CompilerRun},
    session::{BatchSelection, SessionEvent, SessionMode, TestSessionConfig},
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    fmt::Write as _,
};

pub(crate) const TESTS_DIR: &str = "unit_tests/6";
pub(crate) const LEDGER_FILE: &str = "failed.txt";

/// Builds compiler output in the shape both compilers produce: a banner, a parse log whose lines
/// embed paths, and the list of generated files.
pub(crate) fn compiler_output(artifacts: &[&str]) -> String {
    let mut out = String::from("Espresso Compiler\n---\nParsing file: '/tmp/run/Loop.java'\n---\n");
    for artifact in artifacts {
        writeln!(out, "Generated file: '{artifact}'").unwrap();
    }
    out
}

/// An invoker that returns canned output per test case and records every invocation.
#[derive(Debug, Default)]
pub(crate) struct ScriptedInvoker {
    outputs: HashMap<Utf8PathBuf, (String, String)>,
    calls: RefCell<Vec<(CompilerId, Utf8PathBuf)>>,
}

impl ScriptedInvoker {
    pub(crate) fn with_case(mut self, path: &str, subject: &str, reference: &str) -> Self {
        self.outputs
            .insert(path.into(), (subject.to_owned(), reference.to_owned()));
        self
    }

    pub(crate) fn with_passing_case(self, path: &str) -> Self {
        let output = compiler_output(&[]);
        self.with_case(path, &output, &output)
    }

    pub(crate) fn with_failing_case(self, path: &str) -> Self {
        self.with_case(path, "Espresso Compiler\nsyntax error\n", "Espresso Compiler\n")
    }

    pub(crate) fn calls(&self) -> Vec<(CompilerId, Utf8PathBuf)> {
        self.calls.borrow().clone()
    }
}

impl CompilerInvoker for ScriptedInvoker {
    async fn run(&self, compiler: CompilerId, case: &TestCase) -> Result<CompilerRun, InvokeError> {
        self.calls
            .borrow_mut()
            .push((compiler, case.path().to_owned()));
        let (subject, reference) = self
            .outputs
            .get(case.path())
            .unwrap_or_else(|| panic!("unexpected test case {case}"));
        let stdout = match compiler {
            CompilerId::Subject => subject.clone(),
            CompilerId::Reference => reference.clone(),
        };
        Ok(CompilerRun {
            stdout,
            exit_code: Some(0),
        })
    }
}

/// An artifact store backed by a map from file name to contents.
#[derive(Debug, Default)]
pub(crate) struct MemoryStore {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub(crate) fn with_file(mut self, name: &str, contents: &str) -> Self {
        self.files.insert(name.to_owned(), contents.as_bytes().to_vec());
        self
    }
}

impl ArtifactStore for MemoryStore {
    fn read_artifact(
        &self,
        working_dir: &Utf8Path,
        file_name: &str,
    ) -> Result<Vec<u8>, ArtifactReadError> {
        self.files
            .get(file_name)
            .cloned()
            .ok_or_else(|| ArtifactReadError::NotFound {
                path: working_dir.join(file_name),
            })
    }
}

/// A harness root on disk with a tests directory and a ledger.
pub(crate) struct Harness {
    pub(crate) temp_dir: Utf8TempDir,
}

impl Harness {
    pub(crate) fn new() -> Self {
        Self {
            temp_dir: Utf8TempDir::new().unwrap(),
        }
    }

    pub(crate) fn root(&self) -> &Utf8Path {
        self.temp_dir.path()
    }

    /// Creates a test case file and returns its path relative to the root.
    pub(crate) fn add_case(&self, suite: &str, subfolder: &str, name: &str) -> String {
        let path = format!("{TESTS_DIR}/{suite}/{subfolder}/{name}");
        self.temp_dir
            .child(&path)
            .write_str("public class Loop {}\n")
            .unwrap();
        path
    }

    pub(crate) fn write_ledger(&self, contents: &str) {
        self.temp_dir.child(LEDGER_FILE).write_str(contents).unwrap();
    }

    pub(crate) fn ledger_path(&self) -> Utf8PathBuf {
        self.root().join(LEDGER_FILE)
    }

    pub(crate) fn read_ledger(&self) -> Option<String> {
        std::fs::read_to_string(self.ledger_path()).ok()
    }

    pub(crate) fn config(&self, mode: SessionMode) -> TestSessionConfig {
        TestSessionConfig {
            mode,
            harness_root: self.root().to_owned(),
            working_dir: "Phase6".into(),
            tests_dir: TESTS_DIR.into(),
            ledger_path: LEDGER_FILE.into(),
            primary_ignore_pattern: Some(OutputComparator::DEFAULT_PRIMARY_IGNORE.to_owned()),
        }
    }
}

pub(crate) fn good_tests(folders: &[&str]) -> SessionMode {
    SessionMode::Batch(BatchSelection {
        suite_prefix: "Espresso".to_owned(),
        folders: folders.iter().map(|folder| (*folder).to_owned()).collect(),
        subfolders: vec!["GoodTests".to_owned()],
    })
}

/// Summarizes an event as a short string, for asserting on event order.
pub(crate) fn event_summary(event: &SessionEvent<'_>) -> String {
    match event {
        SessionEvent::SessionStarted { case_count, .. } => format!("started {case_count}"),
        SessionEvent::DirectoryStarted { dir } => format!("dir {dir}"),
        SessionEvent::CaseStarted { case } => format!("start {}", case.display_name()),
        SessionEvent::ArtifactChecked { check, .. } => format!(
            "artifact {} {}",
            check.pair.subject,
            if check.failure.is_none() { "ok" } else { "bad" }
        ),
        SessionEvent::CaseFinished { case, result, .. } => format!(
            "finish {} {}",
            case.display_name(),
            if result.outcome.is_success() { "pass" } else { "fail" }
        ),
        SessionEvent::LedgerMissing { .. } => "ledger missing".to_owned(),
        SessionEvent::SessionFinished { stats, .. } => {
            format!("finished {}/{}", stats.passed, stats.finished_count)
        }
        other => panic!("unexpected event {other:?}"),
    }
}
