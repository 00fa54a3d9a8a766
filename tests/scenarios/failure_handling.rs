//! Test: Failure handling - errors abort the run and are reported

use crate::helpers::*;
use buildflow::action::{self, ActionError, ActionExt};
use buildflow::core::{Build, ExecutionStatus, RunError, StandardStep};
use buildflow::execution::{ExecutionEvent, RunOptions};

/// A failing test stage stops build and package from running
#[tokio::test]
async fn test_failure_aborts_dependents() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let tools = build.standard(StandardStep::Tools);
    build.configure(tools).does(recorder.action("tools"));
    let test = build.standard(StandardStep::Test);
    build.configure(test).does(action::fail("3 tests failed"));
    let build_id = build.standard(StandardStep::Build);
    build.configure(build_id).does(recorder.action("build"));

    let (result, events) = run_collecting_events(&mut build, RunOptions::targets(["package"])).await;

    let err = result.unwrap_err();
    assert_eq!(err.to_string(), "step `test` failed: 3 tests failed");
    assert_eq!(recorder.entries(), vec!["tools"]);
    assert!(build.get(test).state().is_failed());
    assert!(build.get(build_id).state().is_not_run());

    assert!(events.iter().any(|e| matches!(
        e,
        ExecutionEvent::StepFailed { step, .. } if step == "test"
    )));
    assert!(matches!(
        events.last(),
        Some(ExecutionEvent::RunCompleted {
            status: ExecutionStatus::Failed,
            ..
        })
    ));
}

/// A failing after-hook fails the step even though the operation worked
#[tokio::test]
async fn test_after_hook_failure_marks_step_failed() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let id = build
        .new_step("deploy", "Deploy to staging")
        .does(recorder.action("deploy"))
        .after_run(action::fail("smoke check failed"))
        .after_run(recorder.action("notify"))
        .id();

    let err = run_targets(&mut build, &["deploy"]).await.unwrap_err();

    assert_eq!(err.step(), Some("deploy"));
    assert_eq!(recorder.entries(), vec!["deploy"]);
    assert!(build.get(id).state().is_failed());
}

/// Unknown targets are errors, not silent no-ops
#[tokio::test]
async fn test_unknown_target_is_reported() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let tools = build.standard(StandardStep::Tools);
    build.configure(tools).does(recorder.action("tools"));

    let err = run_targets(&mut build, &["tools", "deploy"]).await.unwrap_err();

    assert!(matches!(err, RunError::UnknownStep(ref name) if name == "deploy"));
    assert!(recorder.entries().is_empty());
}

/// Unknown skip overrides only warn
#[tokio::test]
async fn test_unknown_skip_override_is_not_fatal() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let tools = build.standard(StandardStep::Tools);
    build.configure(tools).does(recorder.action("tools"));

    let options = RunOptions {
        skip: vec!["does-not-exist".to_string()],
        unskip: vec!["neither-does-this".to_string()],
        ..RunOptions::targets(["tools"])
    };
    assert_completed(run_with(&mut build, options).await);
    assert_eq!(recorder.entries(), vec!["tools"]);
}

/// Catch recovers inside the action; the step and the run succeed
#[tokio::test]
async fn test_catch_recovers_within_step() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let fallback = recorder.action("fallback");
    let fallback = fallback.boxed();
    build.new_step("fetch", "").does(
        action::fail("network down").catch(move |_err: ActionError| fallback.clone()),
    );

    assert_completed(run_targets(&mut build, &["fetch"]).await);
    assert_eq!(recorder.entries(), vec!["fallback"]);
}

/// Finally keeps both failures when cleanup also fails
#[tokio::test]
async fn test_finally_reports_both_failures() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let cleanup = recorder.action("cleanup").then(action::fail("cleanup failed")).boxed();
    build.new_step("package-docs", "").does(
        action::fail("zip failed").finally(move |_outcome: Option<&ActionError>| cleanup.clone()),
    );

    let err = run_targets(&mut build, &["package-docs"]).await.unwrap_err();

    let message = err.to_string();
    assert!(message.contains("zip failed"));
    assert!(message.contains("cleanup failed"));
    assert!(message.find("zip failed") < message.find("cleanup failed"));
    assert_eq!(recorder.entries(), vec!["cleanup"]);
}

/// A cycle is reported with its path before anything runs
#[tokio::test]
async fn test_cycle_detected_before_execution() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let a = build.new_step("a", "").does(recorder.action("a")).id();
    let b = build.new_step("b", "").does(recorder.action("b")).depends_on(a).id();
    build.depends_on(a, b);
    let tools = build.standard(StandardStep::Tools);
    build.configure(tools).does(recorder.action("tools"));

    let err = run_targets(&mut build, &["tools"]).await.unwrap_err();

    assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
    assert!(recorder.entries().is_empty());
}
