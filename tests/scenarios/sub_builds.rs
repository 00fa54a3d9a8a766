//! Test: Sub-builds - importing client and server builds into a parent

use crate::helpers::*;
use buildflow::core::{Build, StandardStep};
use buildflow::execution::{Outcome, RunOptions};

fn component(recorder: &Recorder, name: &str) -> Build {
    let mut build = Build::new();
    let id = build.standard(StandardStep::Build);
    build.configure(id).does(recorder.action(&format!("{}:build", name)));
    let test = build.standard(StandardStep::Test);
    build.configure(test).does(recorder.action(&format!("{}:test", name)));
    build
}

/// Parent `build` depends on both child builds and runs them in order
#[tokio::test]
async fn test_client_server_end_to_end() {
    let recorder = Recorder::new();
    let mut parent = Build::new();
    parent.import("client", component(&recorder, "client"));
    parent.import("server", component(&recorder, "server"));

    let build_id = parent.standard(StandardStep::Build);
    let client_build = parent.step("client:build");
    let server_build = parent.step("server:build");
    parent
        .configure(build_id)
        .depends_on(client_build)
        .depends_on(server_build);

    let report = assert_completed(run_targets(&mut parent, &["build"]).await);

    assert_eq!(
        recorder.entries(),
        vec!["client:test", "client:build", "server:test", "server:build"]
    );
    // The parent's own build step has no work, so it is not reported
    assert!(!report.executed.contains(&"build".to_string()));
    assert_eq!(report.executed.len(), 4);
}

/// Import merges namespaces only; nothing links the two pipelines
#[tokio::test]
async fn test_plain_import_adds_no_edges() {
    let recorder = Recorder::new();
    let mut parent = Build::new();
    parent.import("client", component(&recorder, "client"));

    assert_completed(run_targets(&mut parent, &["package"]).await);
    assert!(recorder.entries().is_empty());

    assert_completed(run_targets(&mut parent, &["client:build"]).await);
    assert_eq!(recorder.entries(), vec!["client:test", "client:build"]);
}

/// Linking makes every parent stage pull in the matching child stage
#[tokio::test]
async fn test_import_and_link_runs_child_stages() {
    let recorder = Recorder::new();
    let mut parent = Build::new();
    parent.import_and_link("client", component(&recorder, "client"));
    let test = parent.standard(StandardStep::Test);
    parent.configure(test).does(recorder.action("test"));

    assert_completed(run_targets(&mut parent, &["build"]).await);
    assert_eq!(
        recorder.entries(),
        vec!["client:test", "test", "client:build"]
    );
}

/// Imported names are prefixed and no unprefixed names leak in
#[tokio::test]
async fn test_imported_names_are_prefixed() {
    let recorder = Recorder::new();
    let mut child = component(&recorder, "child");
    child.new_step("lint", "Run the linter").does(recorder.action("lint"));

    let mut parent = Build::new();
    parent.import("ui", child);

    let names = parent.steps();
    assert!(names.contains(&"ui:lint"));
    assert!(names.contains(&"ui:build"));
    assert!(!names.contains(&"lint"));
    assert_eq!(names.len(), 6 + 7);
}

/// The graph listing shows imported steps and marks shared ones
#[tokio::test]
async fn test_graph_of_composed_build() {
    let recorder = Recorder::new();
    let mut parent = Build::new();
    parent.import_and_link("client", component(&recorder, "client"));

    let outcome = run_with(&mut parent, RunOptions::targets(["graph"])).await.unwrap();
    let graph = match outcome {
        Outcome::Graph(graph) => graph,
        other => panic!("Expected a graph, got {:?}", other),
    };

    assert!(graph.starts_with("package - Package build artifacts\n"));
    assert!(graph.contains("client:build - Build the project"));
    assert!(graph.contains("(duplicate reference)"));
    assert!(recorder.entries().is_empty());
}
