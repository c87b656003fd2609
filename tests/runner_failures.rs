// tests/runner_failures.rs
//
// Failure handling and the started/failed/finished lifecycle signals.

use std::error::Error;
use std::sync::{Arc, Mutex};

use routines::engine::RunRequest;
use routines::errors::RoutineError;
use routines::hooks::FinalizeRef;
use routines::routine::Routine;
use routines::signals::{FailureResponse, RoutineFailed, RoutineFinished, RoutineStarted};
use routines_test_utils::{Harness, RoutineBuilder, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Seen {
    Started { routine: String, continue_on_error: bool },
    Failed { index: usize, error: String },
    Finished { early_exit: bool, last_index: Option<usize> },
}

/// Log every lifecycle signal; failed listeners answer with `response`.
fn record_signals(harness: &mut Harness, response: FailureResponse) -> Arc<Mutex<Vec<Seen>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let started = Arc::clone(&seen);
    let failed = Arc::clone(&seen);
    let finished = Arc::clone(&seen);
    harness
        .signals
        .on_started(move |event: &RoutineStarted<'_>| {
            started.lock().unwrap().push(Seen::Started {
                routine: event.routine.to_string(),
                continue_on_error: event.options.continue_on_error,
            });
        })
        .on_failed(move |event: &RoutineFailed<'_>| {
            failed.lock().unwrap().push(Seen::Failed {
                index: event.failed_index,
                error: event.error.to_string(),
            });
            response
        })
        .on_finished(move |event: &RoutineFinished<'_>| {
            finished.lock().unwrap().push(Seen::Finished {
                early_exit: event.early_exit,
                last_index: event.last_index,
            });
        });
    seen
}

/// `track 1`, `track 2 --raise`, `track 3`, with a finalize counter.
fn failing_routine(finalized: &Arc<Mutex<usize>>) -> Routine {
    let counter = Arc::clone(finalized);
    let mut routine = RoutineBuilder::new("failing", "")
        .management(&["track", "1"])
        .management(&["track", "2", "--raise"])
        .management(&["track", "3"])
        .build();
    routine.finalize = Some(FinalizeRef::finalize(move |_, _| {
        *counter.lock().unwrap() += 1;
        Ok(())
    }));
    routine
}

#[tokio::test]
async fn failures_propagate_by_default() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let seen = record_signals(&mut harness, FailureResponse::Propagate);
        let finalized = Arc::new(Mutex::new(0));
        let runner = harness.runner();

        let err = runner
            .run(&failing_routine(&finalized), &RunRequest::new())
            .await
            .unwrap_err();

        assert!(err.to_string().contains("track failed for 2"), "{err}");
        assert_eq!(harness.tracker.ids(), [1, 2]);
        assert_eq!(
            *seen.lock().unwrap(),
            [
                Seen::Started {
                    routine: "failing".into(),
                    continue_on_error: false,
                },
                Seen::Failed {
                    index: 1,
                    error: err.to_string(),
                },
            ]
        );
        assert_eq!(*finalized.lock().unwrap(), 0);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn continue_on_error_still_signals_the_failure() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let seen = record_signals(&mut harness, FailureResponse::Propagate);
        let finalized = Arc::new(Mutex::new(0));
        let runner = harness.runner();

        let report = runner
            .run(
                &failing_routine(&finalized),
                &RunRequest::new().with_continue_on_error(true),
            )
            .await?;

        assert_eq!(harness.tracker.ids(), [1, 2, 3]);
        assert!(report.plan[1].result.is_none());
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.last_index, Some(2));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert!(matches!(seen[0], Seen::Started { continue_on_error: true, .. }));
        assert!(matches!(seen[1], Seen::Failed { index: 1, .. }));
        assert_eq!(
            seen[2],
            Seen::Finished {
                early_exit: false,
                last_index: Some(2),
            }
        );
        assert_eq!(*finalized.lock().unwrap(), 1);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn a_listener_can_swallow_the_failure() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let seen = record_signals(&mut harness, FailureResponse::Continue);
        let finalized = Arc::new(Mutex::new(0));
        let runner = harness.runner();

        let report = runner
            .run(&failing_routine(&finalized), &RunRequest::new())
            .await?;

        assert_eq!(harness.tracker.ids(), [1, 2, 3]);
        assert!(!report.early_exit);
        assert_eq!(report.last_index, Some(2));
        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(*finalized.lock().unwrap(), 1);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn a_listener_can_end_the_routine_early() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let seen = record_signals(&mut harness, FailureResponse::ExitEarly);
        let finalized = Arc::new(Mutex::new(0));
        let runner = harness.runner();

        // Exit-early wins even over continue-on-error.
        let report = runner
            .run(
                &failing_routine(&finalized),
                &RunRequest::new().with_continue_on_error(true),
            )
            .await?;

        assert_eq!(harness.tracker.ids(), [1, 2]);
        assert!(report.early_exit);
        assert_eq!(report.last_index, Some(1));
        assert_eq!(
            seen.lock().unwrap().last(),
            Some(&Seen::Finished {
                early_exit: true,
                last_index: Some(1),
            })
        );
        assert_eq!(*finalized.lock().unwrap(), 1);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn exit_early_stops_the_broadcast() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let later_calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&later_calls);
        harness
            .signals
            .on_failed(|_: &RoutineFailed<'_>| FailureResponse::ExitEarly)
            .on_failed(move |_: &RoutineFailed<'_>| {
                *counter.lock().unwrap() += 1;
                FailureResponse::Propagate
            });
        let routine = RoutineBuilder::new("broadcast", "")
            .management(&["track", "1", "--raise"])
            .build();
        let runner = harness.runner();

        let report = runner.run(&routine, &RunRequest::new()).await?;

        assert!(report.early_exit);
        assert_eq!(*later_calls.lock().unwrap(), 0);
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_commands_fail_the_routine() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let routine = RoutineBuilder::new("missing", "")
            .management(&["no_such_command"])
            .management(&["track", "1"])
            .build();
        let runner = harness.runner();

        let err = runner
            .run(&routine, &RunRequest::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RoutineError::CommandNotFound(ref name) if name == "no_such_command"));
        assert!(harness.tracker.ids().is_empty());
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn bad_flags_are_usage_errors() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let routine = RoutineBuilder::new("usage", "")
            .management(&["track", "1", "--demo=notanumber"])
            .build();
        let runner = harness.runner();

        let err = runner
            .run(&routine, &RunRequest::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RoutineError::Usage(_)), "{err}");
        TestResult::Ok(())
    })
    .await
}
