// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end sessions against real processes, with `sh` scripts standing in for the compilers.

use crate::fixtures::*;
use phasecheck_runner::{
    invoker::{CompilerCommand, FsArtifactStore, ProcessInvoker},
    session::{SessionMode, SessionOutcome, TestSession},
};
use pretty_assertions::assert_eq;
use std::time::Duration;

/// A fake compiler that writes `<name><ext>` into its working directory and reports it.
fn fake_compiler(ext: &str, body: &str) -> CompilerCommand {
    let script = format!(
        r#"name=$(basename "$0" .java)
printf '%s\n' "{body}" > "$name{ext}"
printf "Espresso\n---\nParsing file: '%s'\n---\nGenerated file: '%s{ext}'\n" "$0" "$name""#
    );
    CompilerCommand::new("sh").with_args(["-c".to_owned(), script])
}

fn process_invoker(
    harness: &Harness,
    subject: CompilerCommand,
    reference: CompilerCommand,
) -> ProcessInvoker {
    let project = harness.root().join("Phase6");
    std::fs::create_dir_all(&project).unwrap();
    ProcessInvoker::new(subject, reference, harness.root(), project)
        .with_timeout(Some(Duration::from_secs(30)))
}

#[tokio::test]
async fn matching_compilers_pass() {
    let harness = Harness::new();
    let case = harness.add_case("Espresso", "GoodTests", "Loop.java");
    let invoker = process_invoker(
        &harness,
        fake_compiler(".rj", ".class public Loop"),
        fake_compiler(".j", ".class public Loop"),
    );
    let mode = SessionMode::Single(case.into());
    let session = TestSession::new(harness.config(mode)).unwrap();

    let outcome = session
        .run(&invoker, &FsArtifactStore, |_| Ok(()))
        .await
        .unwrap();
    let SessionOutcome::Completed(stats) = outcome else {
        panic!("expected a completed session, got {outcome:?}");
    };
    assert_eq!(stats.passed, 1);
    assert_eq!(harness.read_ledger().as_deref(), Some(""));
}

#[tokio::test]
async fn differing_artifacts_fail() {
    let harness = Harness::new();
    let case = harness.add_case("Espresso", "GoodTests", "Loop.java");
    let invoker = process_invoker(
        &harness,
        fake_compiler(".rj", ".class public Loop"),
        fake_compiler(".j", ".class public Loop2"),
    );
    let session = TestSession::new(harness.config(good_tests(&[""]))).unwrap();

    let outcome = session
        .run(&invoker, &FsArtifactStore, |_| Ok(()))
        .await
        .unwrap();
    let SessionOutcome::Completed(stats) = outcome else {
        panic!("expected a completed session, got {outcome:?}");
    };
    assert_eq!(stats.failed_artifact, 1);
    assert_eq!(harness.read_ledger().unwrap(), format!("{case}\n"));
}
