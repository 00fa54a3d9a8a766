//! Test: Cancellation - interrupts and timeouts stop the run at action boundaries

use crate::helpers::*;
use buildflow::action::{self, Action, ActionError, ActionExt};
use buildflow::core::{Build, RunContext, RunError, StandardStep};
use buildflow::execution::{ExecutionEngine, RunOptions};
use std::time::Duration;

/// An action that waits until the run is cancelled
fn wait_for_cancel(recorder: &Recorder) -> impl Action + 'static {
    let started = recorder.action("waiting").boxed();
    action::from_fn(move |ctx: RunContext| {
        let started = started.clone();
        async move {
            started.run(&ctx).await?;
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(3600)) => Ok(()),
                _ = ctx.cancelled() => ctx.check(),
            }
        }
    })
}

/// Cancelling mid-run stops the current action and nothing after it starts
#[tokio::test]
async fn test_interrupt_stops_remaining_steps() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let test = build.standard(StandardStep::Test);
    build.configure(test).does(wait_for_cancel(&recorder));
    let build_id = build.standard(StandardStep::Build);
    build.configure(build_id).does(recorder.action("build"));

    let ctx = RunContext::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        interrupt.cancel("interrupted");
    });

    let err = ExecutionEngine::new()
        .execute(&mut build, &RunOptions::targets(["build"]), &ctx)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(matches!(err, RunError::Cancelled { ref step, ref reason } if step == "test" && reason == "interrupted"));
    assert_eq!(recorder.entries(), vec!["waiting"]);
}

/// A cancelled context prevents the first action from starting at all
#[tokio::test]
async fn test_cancelled_before_start_runs_nothing() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let tools = build.standard(StandardStep::Tools);
    build.configure(tools).does(recorder.action("tools"));

    let ctx = RunContext::new();
    ctx.cancel("shutting down");
    let err = ExecutionEngine::new()
        .execute(&mut build, &RunOptions::targets(["tools"]), &ctx)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(recorder.entries().is_empty());
}

/// The timeout option cancels a run that takes too long
#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_long_step() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    build.new_step("soak", "Long soak test").does(wait_for_cancel(&recorder));

    let options = RunOptions {
        timeout: Some(Duration::from_secs(30)),
        ..RunOptions::targets(["soak"])
    };
    let err = run_with(&mut build, options).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(err.to_string().contains("timed out after 30s"));
}

/// Cancellation is distinct from a business failure
#[tokio::test]
async fn test_cancellation_differs_from_failure() {
    let mut build = Build::new();
    build.new_step("broken", "").does(action::fail("assertion failed"));
    build
        .new_step("aborted", "")
        .does(action::from_fn(|_ctx: RunContext| async move {
            Err::<(), _>(ActionError::Cancelled("user abort".to_string()))
        }));

    let failed = run_targets(&mut build, &["broken"]).await.unwrap_err();
    assert!(!failed.is_cancelled());

    let cancelled = run_targets(&mut build, &["aborted"]).await.unwrap_err();
    assert!(cancelled.is_cancelled());
}

/// A killed child process surfaces as a cancellation
#[cfg(unix)]
#[tokio::test]
async fn test_timeout_kills_external_command() {
    use buildflow::action::{CommandConfig, CommandLine};

    let mut build = Build::new();
    let command = CommandConfig::new().command(CommandLine::Shell("sleep 30".to_string()));
    build.new_step("hang", "").does(command);

    let options = RunOptions {
        timeout: Some(Duration::from_millis(200)),
        ..RunOptions::targets(["hang"])
    };
    let started = std::time::Instant::now();
    let err = run_with(&mut build, options).await.unwrap_err();

    assert!(err.is_cancelled());
    assert!(started.elapsed() < Duration::from_secs(10));
}
