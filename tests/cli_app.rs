// tests/cli_app.rs
//
// The `routine` command surface: index, help, listing, running and `call`.

use std::error::Error;

use routines::{App, RoutineOutcome};
use routines::config::parse_str;
use routines::errors::RoutineError;
use routines_test_utils::{FakeLauncher, Harness, init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const ROUTINES: &str = r#"
[routine.deploy]
help_text = "Deploy the site."
switch_helps = { initial_data = "Load initial data." }

[[routine.deploy.commands]]
management = "track 1"

[[routine.deploy.commands]]
management = "track 2"
switches = ["initial-data"]
priority = 1

[[routine.deploy.commands]]
system = "echo done"
priority = 2

[routine.long_name]
"#;

fn app(harness: &mut Harness) -> Result<App<FakeLauncher>, Box<dyn Error>> {
    let file = parse_str(ROUTINES)?;
    Ok(App::new(file.registry, harness.runner()))
}

fn argv(tokens: &[&str]) -> Vec<String> {
    tokens.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn no_routine_lists_every_routine() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let app = app(&mut harness)?;

        let outcome = app.invoke_routine(&[], None).await?;

        assert_eq!(
            outcome,
            RoutineOutcome::Index(vec!["deploy     Deploy the site.".into(), "long-name".into()])
        );
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn list_shows_the_plan_without_running_it() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let app = app(&mut harness)?;

        let plain = app.invoke_routine(&argv(&["deploy", "list"]), None).await?;
        let switched = app
            .invoke_routine(&argv(&["deploy", "--initial-data", "list"]), None)
            .await?;

        assert_eq!(
            plain,
            RoutineOutcome::Listed(vec!["[0] track 1".into(), "[2] echo done".into()])
        );
        assert_eq!(
            switched,
            RoutineOutcome::Listed(vec![
                "[0] track 1".into(),
                "[1] track 2 | initial-data".into(),
                "[2] echo done".into(),
            ])
        );
        assert!(harness.tracker.ids().is_empty());
        assert!(harness.launcher.launched().is_empty());
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn help_describes_switches_and_commands() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let app = app(&mut harness)?;

        let outcome = app.invoke_routine(&argv(&["deploy", "--help"]), None).await?;

        let RoutineOutcome::Help(text) = outcome else {
            panic!("expected help, got {outcome:?}");
        };
        assert!(text.contains("Deploy the site."));
        assert!(text.contains("--initial-data"));
        assert!(text.contains("Load initial data."));
        assert!(text.contains("[1] track 2 | initial-data"));
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn running_honours_switches_and_policy_flags() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let app = app(&mut harness)?;

        let outcome = app
            .invoke_routine(&argv(&["--deploy", "--initial-data", "--subprocess"]), Some(0))
            .await?;

        let RoutineOutcome::Ran(report) = outcome else {
            panic!("expected a run, got {outcome:?}");
        };
        assert_eq!(report.routine, "deploy");
        assert_eq!(report.last_index, Some(2));
        assert!(harness.tracker.ids().is_empty());
        assert_eq!(
            harness.launcher.launched_lines(),
            ["./manage call track 1", "./manage call track 2", "echo done"]
        );
        TestResult::Ok(())
    })
    .await
}

#[tokio::test]
async fn unknown_routines_and_flags_are_errors() -> TestResult {
    with_timeout(async {
        init_tracing();
        let mut harness = Harness::new();
        let app = app(&mut harness)?;

        let missing = app.invoke_routine(&argv(&["nope"]), None).await.unwrap_err();
        assert!(matches!(missing, RoutineError::RoutineNotFound(ref name) if name == "nope"));

        let bad_flag = app
            .invoke_routine(&argv(&["deploy", "--bogus"]), None)
            .await
            .unwrap_err();
        assert!(matches!(bad_flag, RoutineError::Usage(_)));
        TestResult::Ok(())
    })
    .await
}

#[test]
fn call_runs_one_command_in_process() -> TestResult {
    let mut harness = Harness::new();
    let app = app(&mut harness)?;

    let output = app.call(&argv(&["track", "7", "--demo=2"]), Some(3))?;

    assert_eq!(output.as_deref(), Some("7"));
    let records = harness.tracker.records();
    assert_eq!(records[0].demo, Some(2));
    assert_eq!(records[0].verbosity, Some(3));
    Ok(())
}

#[test]
fn call_rejects_repeated_options_and_renders_help() -> TestResult {
    let mut harness = Harness::new();
    let app = app(&mut harness)?;

    let repeated = app
        .call(&argv(&["track", "1", "--demo=1", "--demo=2"]), None)
        .unwrap_err();
    assert!(matches!(repeated, RoutineError::Usage(_)), "{repeated}");
    assert!(harness.tracker.ids().is_empty());

    match app.call(&argv(&["track", "--help"]), None) {
        Err(RoutineError::Help(text)) => {
            assert!(text.contains("--demo"));
            assert!(text.contains("--raise"));
        }
        other => panic!("expected help, got {other:?}"),
    }
    Ok(())
}
