// tests/runner_subprocess.rs
//
// Subprocess mode, system commands and process failures, against the
// recording `FakeLauncher`.

use std::error::Error;

use routines::engine::RunRequest;
use routines::errors::RoutineError;
use routines::types::{CommandOutcome, ProcessOutput};
use routines_test_utils::{FakeLauncher, Harness, RoutineBuilder, init_tracing, track, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn subprocess_mode_reinvokes_through_the_manage_script() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();
        let routine = RoutineBuilder::new("sub", "")
            .command(track(4).with_option("demo", 6)?)
            .command(track(5).with_option("flag", false)?.with_priority(1))
            .subprocess(true)
            .build();

        let report = runner.run(&routine, &RunRequest::new()).await?;

        assert!(harness.tracker.ids().is_empty());
        assert_eq!(
            harness.launcher.launched_lines(),
            ["./manage call track 4 --demo=6", "./manage call track 5"]
        );
        assert_eq!(
            report.results[0],
            CommandOutcome::Process(ProcessOutput {
                code: 0,
                stdout: "./manage call track 4 --demo=6\n".into(),
                stderr: String::new(),
            })
        );
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn system_commands_always_launch() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();
        let routine = RoutineBuilder::new("mixed", "")
            .track(1, 0, &[])
            .system(&["ls", "-l"])
            .build();

        let report = runner.run(&routine, &RunRequest::new()).await?;

        assert_eq!(harness.tracker.ids(), [1]);
        assert_eq!(harness.launcher.launched_lines(), ["ls -l"]);
        assert_eq!(report.results[1].text(), Some("ls -l\n"));
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn nonzero_exit_records_the_result_then_fails() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        harness.launcher = FakeLauncher::new().fail_on("track 5", 3);
        let routine = RoutineBuilder::new("exit", "")
            .track(4, 0, &[])
            .track(5, 1, &[])
            .track(6, 2, &[])
            .subprocess(true)
            .build();
        let runner = harness.runner();

        let err = runner
            .run(&routine, &RunRequest::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RoutineError::SubprocessFailed { ref command, code: 3 } if command == "./manage call track 5"
        ));
        assert_eq!(
            err.to_string(),
            "Subprocess command failed: ./manage call track 5 with return code 3."
        );

        let report = runner
            .run(&routine, &RunRequest::new().with_continue_on_error(true))
            .await?;
        match &report.plan[1].result {
            Some(CommandOutcome::Process(out)) => assert_eq!(out.code, 3),
            other => panic!("expected a process outcome, got {other:?}"),
        }
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.last_index, Some(2));
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn options_without_parameters_cannot_run_as_subprocess() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let runner = harness.runner();
        let routine = RoutineBuilder::new("bogus", "")
            .command(track(1).with_option("bogus", 2)?)
            .build();

        let err = runner
            .run(&routine, &RunRequest::new().with_subprocess(true))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RoutineError::UnconvertibleOptions { ref command, ref options }
                if command == "track" && options == "{bogus=2}"
        ));
        assert!(harness.launcher.launched().is_empty());
        TestResult::Ok(())
    })
    .await
}
