//! Test: Standard pipeline - the six pre-wired stages

use crate::helpers::*;
use buildflow::core::{Build, StandardStep, StepState};
use buildflow::execution::RunOptions;

fn recorded_build(recorder: &Recorder) -> Build {
    let mut build = Build::new();
    for standard in StandardStep::ALL {
        let id = build.standard(standard);
        build.configure(id).does(recorder.action(standard.name()));
    }
    build
}

/// `build` runs every earlier stage except the skipped benchmark, and not package
#[tokio::test]
async fn test_build_target_runs_earlier_stages() {
    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);

    let report = assert_completed(run_targets(&mut build, &["build"]).await);

    assert_eq!(recorder.entries(), vec!["tools", "generate", "test", "build"]);
    assert_eq!(report.executed, vec!["tools", "generate", "test", "build"]);
    assert_eq!(report.skipped, vec!["benchmark"]);
    assert!(build
        .get(build.standard(StandardStep::Package))
        .state()
        .is_not_run());
    assert_eq!(
        build.get(build.standard(StandardStep::Benchmark)).state(),
        &StepState::Skipped
    );
}

/// Naming benchmark directly runs it even though it is skipped by default
#[tokio::test]
async fn test_benchmark_runs_when_named() {
    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);

    assert_completed(run_targets(&mut build, &["benchmark", "package"]).await);

    assert_eq!(
        recorder.entries(),
        vec!["tools", "generate", "test", "benchmark", "build", "package"]
    );
}

/// Each stage runs once even when several targets reach it
#[tokio::test]
async fn test_repeated_targets_run_once() {
    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);

    assert_completed(run_targets(&mut build, &["test", "build", "test", "package"]).await);

    for standard in ["tools", "generate", "test", "build", "package"] {
        assert_eq!(recorder.count(standard), 1, "{} should run once", standard);
    }
    assert_eq!(recorder.count("benchmark"), 0);
}

/// Hooks wrap the operation, after dependencies finish
#[tokio::test]
async fn test_hook_order_with_dependencies() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let generate = build.standard(StandardStep::Generate);
    build.configure(generate).does(recorder.action("generate"));

    let test = build.standard(StandardStep::Test);
    build
        .configure(test)
        .before_run(recorder.action("A"))
        .before_run(recorder.action("B"))
        .does(recorder.action("O"))
        .after_run(recorder.action("C"))
        .after_run(recorder.action("D"));

    assert_completed(run_targets(&mut build, &["test"]).await);
    assert_eq!(recorder.entries(), vec!["generate", "A", "B", "O", "C", "D"]);
}

/// A diamond of custom steps under `build` runs the shared leaf once
#[tokio::test]
async fn test_shared_dependency_runs_exactly_once() {
    let recorder = Recorder::new();
    let mut build = Build::new();
    let codegen = build.new_step("codegen", "Generate protobufs").does(recorder.action("codegen")).id();

    let build_id = build.standard(StandardStep::Build);
    for name in ["api", "worker", "cli", "web"] {
        let id = build
            .new_step(name, "")
            .does(recorder.action(name))
            .depends_on(codegen)
            .id();
        build.depends_on(build_id, id);
    }

    assert_completed(run_targets(&mut build, &["build"]).await);
    assert_eq!(recorder.count("codegen"), 1);
    assert_eq!(
        recorder.entries(),
        vec!["codegen", "api", "worker", "cli", "web"]
    );
}

/// `--only` runs the target alone; `--skip` keeps dependencies running
#[tokio::test]
async fn test_only_and_skip_flags() {
    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);
    let options = RunOptions {
        only: true,
        ..RunOptions::targets(["test"])
    };
    assert_completed(run_with(&mut build, options).await);
    assert_eq!(recorder.entries(), vec!["test"]);

    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);
    let options = RunOptions {
        skip: vec!["generate".to_string()],
        ..RunOptions::targets(["test"])
    };
    assert_completed(run_with(&mut build, options).await);
    assert_eq!(recorder.entries(), vec!["tools", "test"]);
}

/// A second invocation on the same build only reruns after a reset
#[tokio::test]
async fn test_reset_states_allows_rerun() {
    let recorder = Recorder::new();
    let mut build = recorded_build(&recorder);

    assert_completed(run_targets(&mut build, &["tools"]).await);
    assert_completed(run_targets(&mut build, &["tools"]).await);
    assert_eq!(recorder.count("tools"), 1);

    build.reset_states();
    assert_completed(run_targets(&mut build, &["tools"]).await);
    assert_eq!(recorder.count("tools"), 2);
}
