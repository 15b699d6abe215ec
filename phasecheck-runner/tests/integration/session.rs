// Copyright (c) The phasecheck Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use phasecheck_runner::{
    errors::SessionError,
    invoker::CompilerId,
    session::{SessionEvent, SessionMode, SessionOutcome, TestSession},
    validator::{CaseOutcome, FailureKind},
};
use pretty_assertions::assert_eq;
use std::io;

#[tokio::test]
async fn all_passing_batch_clears_ledger() {
    let harness = Harness::new();
    let loop_case = harness.add_case("Espresso", "GoodTests", "Loop.java");
    let fib_case = harness.add_case("Espresso", "GoodTests", "Fib.java");
    harness.write_ledger("unit_tests/6/Espresso/GoodTests/Stale.java\n");

    let invoker = ScriptedInvoker::default()
        .with_passing_case(&loop_case)
        .with_passing_case(&fib_case);
    let session = TestSession::new(harness.config(good_tests(&[""]))).unwrap();

    let outcome = session
        .run(&invoker, &MemoryStore::default(), |_| Ok(()))
        .await
        .unwrap();
    let SessionOutcome::Completed(stats) = outcome else {
        panic!("expected a completed session, got {outcome:?}");
    };
    assert_eq!(stats.initial_count, 2);
    assert_eq!(stats.passed, 2);
    assert!(!stats.has_failures());

    assert_eq!(harness.read_ledger().as_deref(), Some(""));
}

#[tokio::test]
async fn failures_are_recorded_in_path_order() {
    let harness = Harness::new();
    let a = harness.add_case("Espresso", "GoodTests", "A.java");
    let b = harness.add_case("Espresso", "GoodTests", "B.java");
    let c = harness.add_case("Espresso_Plus", "GoodTests", "C.java");

    let invoker = ScriptedInvoker::default()
        .with_failing_case(&c)
        .with_passing_case(&b)
        .with_failing_case(&a);
    // Suites are listed out of order on purpose.
    let session = TestSession::new(harness.config(good_tests(&["_Plus", ""]))).unwrap();

    let mut events = Vec::new();
    session
        .run(&invoker, &MemoryStore::default(), |event| {
            events.push(event_summary(&event));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        events,
        vec![
            "started 3",
            "dir unit_tests/6/Espresso/GoodTests",
            "start A.java",
            "finish A.java fail",
            "start B.java",
            "finish B.java pass",
            "dir unit_tests/6/Espresso_Plus/GoodTests",
            "start C.java",
            "finish C.java fail",
            "finished 1/3",
        ]
    );
    assert_eq!(harness.read_ledger().unwrap(), format!("{a}\n{c}\n"));
}

#[tokio::test]
async fn recheck_runs_exactly_the_ledger_entries() {
    let harness = Harness::new();
    harness.write_ledger("\n   \nunit_tests/6/Espresso/GoodTests/Loop.java\n\n");

    let invoker =
        ScriptedInvoker::default().with_passing_case("unit_tests/6/Espresso/GoodTests/Loop.java");
    let session = TestSession::new(harness.config(SessionMode::Recheck)).unwrap();

    let outcome = session
        .run(&invoker, &MemoryStore::default(), |_| Ok(()))
        .await
        .unwrap();
    let SessionOutcome::Completed(stats) = outcome else {
        panic!("expected a completed session, got {outcome:?}");
    };
    assert_eq!(stats.finished_count, 1);
    assert_eq!(
        invoker.calls(),
        vec![
            (
                CompilerId::Subject,
                "unit_tests/6/Espresso/GoodTests/Loop.java".into()
            ),
            (
                CompilerId::Reference,
                "unit_tests/6/Espresso/GoodTests/Loop.java".into()
            ),
        ]
    );
    // The case now passes, so the ledger is cleared.
    assert_eq!(harness.read_ledger().as_deref(), Some(""));
}

#[tokio::test]
async fn recheck_without_ledger_runs_nothing() {
    let harness = Harness::new();
    let invoker = ScriptedInvoker::default();
    let session = TestSession::new(harness.config(SessionMode::Recheck)).unwrap();

    let mut events = Vec::new();
    let outcome = session
        .run(&invoker, &MemoryStore::default(), |event| {
            events.push(event_summary(&event));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        SessionOutcome::LedgerMissing {
            path: harness.ledger_path()
        }
    );
    assert_eq!(events, vec!["ledger missing"]);
    assert!(invoker.calls().is_empty());
    assert_eq!(harness.read_ledger(), None, "no ledger is written");
}

#[tokio::test]
async fn single_case_is_flushed() {
    let harness = Harness::new();
    let case = harness.add_case("Espresso", "BadTests", "Broken.java");
    let invoker = ScriptedInvoker::default().with_failing_case(&case);
    let mode = SessionMode::Single(case.clone().into());
    let session = TestSession::new(harness.config(mode)).unwrap();

    let mut events = Vec::new();
    session
        .run(&invoker, &MemoryStore::default(), |event| {
            events.push(event_summary(&event));
            Ok(())
        })
        .await
        .unwrap();

    // Single sessions don't group cases by directory.
    assert_eq!(
        events,
        vec![
            "started 1",
            "start Broken.java",
            "finish Broken.java fail",
            "finished 0/1",
        ]
    );
    assert_eq!(harness.read_ledger().unwrap(), format!("{case}\n"));
}

#[tokio::test]
async fn artifact_mismatch_is_reported_per_pair() {
    let harness = Harness::new();
    let case = harness.add_case("Espresso", "GoodTests", "Loop.java");
    let subject = compiler_output(&["Loop.rj", "Loop$Inner.rj"]);
    let reference = compiler_output(&["Loop.j", "Loop$Inner.j"]);
    let invoker = ScriptedInvoker::default().with_case(&case, &subject, &reference);
    let store = MemoryStore::default()
        .with_file("Loop.rj", ".class public Loop\n")
        .with_file("Loop.j", ".class public Loop\n")
        .with_file("Loop$Inner.rj", ".method foo\n")
        .with_file("Loop$Inner.j", ".method bar\n");
    let mode = SessionMode::Single(case.clone().into());
    let session = TestSession::new(harness.config(mode)).unwrap();

    let mut events = Vec::new();
    let mut outcomes = Vec::new();
    session
        .run(&invoker, &store, |event| {
            if let SessionEvent::CaseFinished { result, .. } = &event {
                outcomes.push(result.outcome.clone());
            }
            events.push(event_summary(&event));
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(
        events,
        vec![
            "started 1",
            "start Loop.java",
            "artifact Loop.rj ok",
            "artifact Loop$Inner.rj bad",
            "finish Loop.java fail",
            "finished 0/1",
        ]
    );
    assert_eq!(
        outcomes[0].failure_kind(),
        Some(FailureKind::ArtifactContentMismatch)
    );
    assert!(matches!(outcomes[0], CaseOutcome::FailedArtifact { .. }));
}

#[tokio::test]
async fn callback_error_aborts_session() {
    let harness = Harness::new();
    let case = harness.add_case("Espresso", "GoodTests", "Loop.java");
    let invoker = ScriptedInvoker::default().with_passing_case(&case);
    let session = TestSession::new(harness.config(good_tests(&[""]))).unwrap();

    let err = session
        .run(&invoker, &MemoryStore::default(), |_| {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stderr closed"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Report { .. }), "{err:?}");
    assert!(invoker.calls().is_empty(), "aborted before running cases");
}
