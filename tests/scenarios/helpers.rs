//! Test utility functions for buildflow scenarios

use buildflow::action::{self, Action};
use buildflow::core::{Build, RunContext, RunError};
use buildflow::execution::{ExecutionEngine, ExecutionEvent, Outcome, RunOptions, RunReport};
use std::sync::{Arc, Mutex};

/// Shared log that actions append to, in invocation order
#[derive(Clone, Default)]
pub struct Recorder {
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// An action that appends `entry` when it runs
    pub fn action(&self, entry: &str) -> impl Action + 'static {
        let log = self.log.clone();
        let entry = entry.to_string();
        action::from_fn(move |_ctx| {
            let log = log.clone();
            let entry = entry.clone();
            async move {
                log.lock().unwrap().push(entry);
                Ok(())
            }
        })
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|e| *e == entry).count()
    }
}

/// Run `options` against `build` with a fresh context
pub async fn run_with(build: &mut Build, options: RunOptions) -> Result<Outcome, RunError> {
    ExecutionEngine::new()
        .execute(build, &options, &RunContext::new())
        .await
}

/// Run the named targets with default options
pub async fn run_targets(build: &mut Build, targets: &[&str]) -> Result<Outcome, RunError> {
    run_with(build, RunOptions::targets(targets.iter().copied())).await
}

/// Run and collect every emitted event
pub async fn run_collecting_events(
    build: &mut Build,
    options: RunOptions,
) -> (Result<Outcome, RunError>, Vec<ExecutionEvent>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();

    let mut engine = ExecutionEngine::new();
    engine.add_event_handler(move |event| sink.lock().unwrap().push(event));
    let result = engine.execute(build, &options, &RunContext::new()).await;

    let events = events.lock().unwrap().clone();
    (result, events)
}

/// Assert the invocation ran targets and return its report
pub fn assert_completed(outcome: Result<Outcome, RunError>) -> RunReport {
    match outcome {
        Ok(Outcome::Completed(report)) => report,
        Ok(other) => panic!("Expected a completed run, got {:?}", other),
        Err(e) => panic!("Run failed: {}", e),
    }
}
