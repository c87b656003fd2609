// tests/runner_atomic.rs
//
// Atomic routines roll their store writes back when a command fails, and
// commit them when the routine ends early.

use std::error::Error;
use std::sync::{Arc, Mutex};

use routines::engine::RunRequest;
use routines::hooks::HookRef;
use routines::routine::{Command, Routine};
use routines::signals::{FailureResponse, RoutineFailed};
use routines_test_utils::{Harness, RoutineBuilder, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn edits(atomic: bool) -> Routine {
    RoutineBuilder::new("edits", "")
        .management(&["edit", "1"])
        .management(&["edit", "2", "--value", "two"])
        .management(&["edit", "3", "--raise"])
        .atomic(atomic)
        .build()
}

#[tokio::test]
async fn atomic_failure_rolls_back_every_write() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        harness.store.set("0", "before");
        let runner = harness.runner();

        let result = runner.run(&edits(true), &RunRequest::new()).await;

        assert!(result.is_err());
        assert_eq!(harness.store.keys(), ["0"]);
        assert_eq!(harness.store.get("0").as_deref(), Some("before"));
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn non_atomic_failure_keeps_earlier_writes() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();

        let result = runner.run(&edits(false), &RunRequest::new()).await;

        assert!(result.is_err());
        assert_eq!(harness.store.keys(), ["1", "2", "3"]);
        assert_eq!(harness.store.get("2").as_deref(), Some("two"));
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn atomic_can_be_requested_per_run() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();

        let result = runner
            .run(&edits(false), &RunRequest::new().with_atomic(true))
            .await;

        assert!(result.is_err());
        assert!(harness.store.keys().is_empty());
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn swallowed_failures_commit_the_transaction() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();

        let report = runner
            .run(&edits(true), &RunRequest::new().with_continue_on_error(true))
            .await?;

        assert_eq!(report.last_index, Some(1));
        assert_eq!(harness.store.keys(), ["1", "2", "3"]);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn post_hook_early_exit_commits_the_transaction() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let failures = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&failures);
        harness.signals.on_failed(move |_: &RoutineFailed<'_>| {
            *counter.lock().unwrap() += 1;
            FailureResponse::Propagate
        });
        let routine = RoutineBuilder::new("stop_after_two", "")
            .management(&["edit", "1"])
            .command(
                Command::management(["edit", "2"])?
                    .with_post_hook(HookRef::hook(|_, _, _, _| Ok(true))),
            )
            .management(&["edit", "3"])
            .atomic(true)
            .build();
        let runner = harness.runner();

        let report = runner.run(&routine, &RunRequest::new()).await?;

        assert!(report.early_exit);
        assert_eq!(report.last_index, Some(1));
        assert_eq!(harness.store.keys(), ["1", "2"]);
        assert_eq!(*failures.lock().unwrap(), 0);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn listener_early_exit_keeps_writes_of_the_failed_command() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        harness
            .signals
            .on_failed(|_: &RoutineFailed<'_>| FailureResponse::ExitEarly);
        let runner = harness.runner();

        let report = runner.run(&edits(true), &RunRequest::new()).await?;

        assert!(report.early_exit);
        assert_eq!(report.last_index, Some(2));
        assert_eq!(harness.store.keys(), ["1", "2", "3"]);
        TestResult::Ok(())
    })
    .await
}
