//! Main execution engine - orchestrates one invocation of the build

use crate::{
    core::{
        graph, Build, ExecutionStatus, RunContext, RunError, StepId, GRAPH_COMMAND, STEPS_COMMAND,
    },
    execution::{ActionKind, StepExecutor},
};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Events that can occur during an invocation
#[derive(Debug, Clone)]
pub enum ExecutionEvent {
    RunStarted {
        execution_id: Uuid,
        targets: Vec<String>,
        dry_run: bool,
    },
    StepStarted {
        step: String,
    },
    StepSkipped {
        step: String,
    },
    /// The step was reached with its dependencies switched off
    DependenciesSkipped {
        step: String,
    },
    /// Dry run: an action that would have been invoked
    ActionPlanned {
        step: String,
        kind: ActionKind,
    },
    StepCompleted {
        step: String,
        duration: Duration,
    },
    StepFailed {
        step: String,
        error: String,
    },
    RunCompleted {
        execution_id: Uuid,
        status: ExecutionStatus,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(ExecutionEvent) + Send + Sync>;

/// What the caller asked for
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Step names to run in order, or a single `graph`/`steps` listing
    pub targets: Vec<String>,

    /// Steps to mark skipped before running
    pub skip: Vec<String>,

    /// Steps to clear the skip flag on before running
    pub unskip: Vec<String>,

    /// Run the targets without their dependencies
    pub only: bool,

    /// Cancel the run once this much time has passed
    pub timeout: Option<Duration>,

    /// Report what would run without invoking any action
    pub dry_run: bool,

    /// Show steps without any work in listings
    pub verbose: bool,
}

impl RunOptions {
    pub fn targets<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub execution_id: Uuid,
    pub targets: Vec<String>,

    /// Steps whose hooks or operation ran, in order
    pub executed: Vec<String>,

    /// Steps reached but skipped, in order
    pub skipped: Vec<String>,

    pub dry_run: bool,
    pub duration: Duration,
}

/// Result of a successful invocation
#[derive(Debug, Clone)]
pub enum Outcome {
    /// Rendered dependency tree
    Graph(String),
    /// Rendered step list
    Steps(String),
    Completed(RunReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    Graph,
    Steps,
}

/// Drives a [`Build`] through one invocation
///
/// `Idle -> ResolvingFlags -> CycleChecking -> Listing | RunningTargets ->
/// Done | Failed`, stopping at the first error.
pub struct ExecutionEngine {
    event_handlers: Vec<EventHandler>,
    status: ExecutionStatus,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        Self {
            event_handlers: Vec::new(),
            status: ExecutionStatus::Idle,
        }
    }

    /// Add an event handler
    pub fn add_event_handler<F>(&mut self, handler: F)
    where
        F: Fn(ExecutionEvent) + Send + Sync + 'static,
    {
        self.event_handlers.push(Arc::new(handler));
    }

    /// Phase of the current or last invocation
    pub fn status(&self) -> ExecutionStatus {
        self.status
    }

    fn emit_event(&self, event: ExecutionEvent) {
        for handler in &self.event_handlers {
            handler(event.clone());
        }
    }

    fn transition(&mut self, status: ExecutionStatus) {
        debug!("Execution status {:?} -> {:?}", self.status, status);
        self.status = status;
    }

    /// Resolve the options against `build` and run or list
    ///
    /// Step states are not reset first, so steps that already ran in an
    /// earlier invocation on the same build are not run again; call
    /// [`Build::reset_states`] to start over. An unknown target or a cycle
    /// fails before any skip flag on the build is changed.
    pub async fn execute(
        &mut self,
        build: &mut Build,
        options: &RunOptions,
        ctx: &RunContext,
    ) -> Result<Outcome, RunError> {
        self.status = ExecutionStatus::Idle;
        let result = self.execute_inner(build, options, ctx).await;
        match &result {
            Ok(_) => self.transition(ExecutionStatus::Done),
            Err(e) => {
                error!("Execution failed: {}", e);
                self.transition(ExecutionStatus::Failed);
            }
        }
        result
    }

    async fn execute_inner(
        &mut self,
        build: &mut Build,
        options: &RunOptions,
        ctx: &RunContext,
    ) -> Result<Outcome, RunError> {
        let first = options
            .targets
            .first()
            .map(|t| t.trim().to_lowercase())
            .ok_or(RunError::NoTargets)?;

        self.transition(ExecutionStatus::ResolvingFlags);
        let listing = match first.as_str() {
            GRAPH_COMMAND => Some(Listing::Graph),
            STEPS_COMMAND => Some(Listing::Steps),
            _ => None,
        };
        if listing.is_some() && options.targets.len() > 1 {
            warn!("Ignoring targets after `{}`", first);
        }

        let targets = match listing {
            Some(_) => Vec::new(),
            None => resolve_targets(build, options)?,
        };

        self.transition(ExecutionStatus::CycleChecking);
        build.check_cycles()?;

        // Flags touch the build only once every target resolved and the graph is acyclic
        apply_overrides(build, options);
        apply_target_flags(build, &targets, options.only);

        if let Some(listing) = listing {
            self.transition(ExecutionStatus::Listing);
            return Ok(match listing {
                Listing::Graph => Outcome::Graph(graph::render_graph(build, options.verbose)),
                Listing::Steps => Outcome::Steps(graph::render_steps(build, options.verbose)),
            });
        }

        self.transition(ExecutionStatus::RunningTargets);
        let ctx = match options.timeout {
            Some(timeout) => ctx.with_timeout(timeout),
            None => ctx.clone(),
        };

        let execution_id = Uuid::new_v4();
        let names: Vec<String> = targets
            .iter()
            .map(|id| build.get(*id).name().to_string())
            .collect();
        info!("Starting run {} for {}", execution_id, names.join(", "));
        self.emit_event(ExecutionEvent::RunStarted {
            execution_id,
            targets: names.clone(),
            dry_run: options.dry_run,
        });

        let started = Instant::now();
        let mut executor = StepExecutor::new(self.event_handlers.clone(), options.dry_run);
        for (id, name) in targets.iter().zip(&names) {
            debug!("Running target {}", name);
            if let Err(e) = executor.run(build, *id, &ctx).await {
                self.emit_event(ExecutionEvent::RunCompleted {
                    execution_id,
                    status: ExecutionStatus::Failed,
                });
                return Err(e);
            }
        }

        let (executed, skipped) = executor.into_parts();
        let report = RunReport {
            execution_id,
            targets: names,
            executed,
            skipped,
            dry_run: options.dry_run,
            duration: started.elapsed(),
        };
        info!(
            "Run {} finished: {} steps ran in {:?}",
            execution_id,
            report.executed.len(),
            report.duration
        );
        self.emit_event(ExecutionEvent::RunCompleted {
            execution_id,
            status: ExecutionStatus::Done,
        });

        Ok(Outcome::Completed(report))
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `--skip`/`--unskip`; unknown names only warn
fn apply_overrides(build: &mut Build, options: &RunOptions) {
    for name in &options.skip {
        match build.step_ok(name) {
            Some(id) => {
                debug!("Skipping {} on request", name);
                build.get_mut(id).skip();
            }
            None => warn!("Cannot skip unknown step `{}`", name),
        }
    }
    for name in &options.unskip {
        match build.step_ok(name) {
            Some(id) => {
                debug!("Unskipping {} on request", name);
                build.get_mut(id).unskip();
            }
            None => warn!("Cannot unskip unknown step `{}`", name),
        }
    }
}

/// Look up every target without touching the build
fn resolve_targets(build: &Build, options: &RunOptions) -> Result<Vec<StepId>, RunError> {
    options
        .targets
        .iter()
        .map(|name| {
            build
                .step_ok(name)
                .ok_or_else(|| RunError::UnknownStep(name.trim().to_string()))
        })
        .collect()
}

/// A named target always runs itself; with `only` it runs alone
fn apply_target_flags(build: &mut Build, targets: &[StepId], only: bool) {
    for &id in targets {
        let step = build.get_mut(id);
        step.unskip();
        if only {
            step.skip_dependencies();
        }
    }
}
