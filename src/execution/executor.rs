//! Step executor - walks one target's dependency graph and runs its actions

use crate::{
    action::{ActionError, BoxedAction},
    core::{Build, RunContext, RunError, StepId, StepState},
    execution::{EventHandler, ExecutionEvent},
};
use chrono::Utc;
use std::fmt;
use std::time::Instant;
use tracing::{debug, error, info};

/// Which of a step's actions is being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    /// Before-hook, by position
    BeforeHook(usize),
    Operation,
    /// After-hook, by position
    AfterHook(usize),
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::BeforeHook(i) => write!(f, "before hook #{}", i + 1),
            ActionKind::Operation => write!(f, "operation"),
            ActionKind::AfterHook(i) => write!(f, "after hook #{}", i + 1),
        }
    }
}

/// One pending step on the walk stack
struct Frame {
    id: StepId,
    entered: bool,
    next_dependency: usize,
}

impl Frame {
    fn new(id: StepId) -> Self {
        Self {
            id,
            entered: false,
            next_dependency: 0,
        }
    }
}

/// Runs targets one at a time, each step at most once
///
/// Dependencies are walked depth-first in declaration order with an explicit
/// stack, so arbitrarily deep chains are fine. Step states live in the
/// [`Build`]; a step already past `NotRun` is never started again.
pub struct StepExecutor {
    handlers: Vec<EventHandler>,
    dry_run: bool,
    executed: Vec<String>,
    skipped: Vec<String>,
}

impl StepExecutor {
    pub fn new(handlers: Vec<EventHandler>, dry_run: bool) -> Self {
        Self {
            handlers,
            dry_run,
            executed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Steps whose work ran (or would have, in a dry run), in order
    pub fn executed(&self) -> &[String] {
        &self.executed
    }

    /// Steps reached but skipped, in order
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.executed, self.skipped)
    }

    fn emit(&self, event: ExecutionEvent) {
        for handler in &self.handlers {
            handler(event.clone());
        }
    }

    /// Run `target` after everything it depends on
    ///
    /// The first failure aborts the walk and is returned.
    pub async fn run(
        &mut self,
        build: &mut Build,
        target: StepId,
        ctx: &RunContext,
    ) -> Result<(), RunError> {
        let mut on_stack = vec![false; build.len()];
        let mut frames = vec![Frame::new(target)];
        on_stack[target.index()] = true;

        while let Some(frame) = frames.last_mut() {
            let step = build.get(frame.id);

            if !frame.entered {
                frame.entered = true;
                if !step.state().is_not_run() {
                    // Already reached through another path
                    frame.next_dependency = step.dependencies().len();
                } else if step.skips_dependencies() {
                    debug!("Not traversing dependencies of {}", step.name());
                    frame.next_dependency = step.dependencies().len();
                    self.emit(ExecutionEvent::DependenciesSkipped {
                        step: step.name().to_string(),
                    });
                }
            }

            if let Some(&dep) = step.dependencies().get(frame.next_dependency) {
                frame.next_dependency += 1;
                let dependency = build.get(dep);
                match dependency.state() {
                    StepState::NotRun if on_stack[dep.index()] => {
                        let start = frames.iter().position(|f| f.id == dep).unwrap_or(0);
                        let mut path: Vec<&str> =
                            frames[start..].iter().map(|f| build.get(f.id).name()).collect();
                        path.push(dependency.name());
                        return Err(RunError::Cycle {
                            path: path.join(" -> "),
                        });
                    }
                    StepState::NotRun => {
                        on_stack[dep.index()] = true;
                        frames.push(Frame::new(dep));
                    }
                    StepState::Failed { .. } => {
                        return Err(RunError::PreviouslyFailed(dependency.name().to_string()));
                    }
                    StepState::Skipped | StepState::Succeeded { .. } => {}
                }
                continue;
            }

            let id = frame.id;
            frames.pop();
            on_stack[id.index()] = false;
            self.run_step(build, id, ctx).await?;
        }

        Ok(())
    }

    /// Run one step's own hooks and operation, dependencies already done
    async fn run_step(
        &mut self,
        build: &mut Build,
        id: StepId,
        ctx: &RunContext,
    ) -> Result<(), RunError> {
        let step = build.get(id);
        let name = step.name().to_string();
        match step.state() {
            StepState::NotRun => {}
            StepState::Failed { .. } => return Err(RunError::PreviouslyFailed(name)),
            StepState::Skipped | StepState::Succeeded { .. } => {
                debug!("Step {} already done", name);
                return Ok(());
            }
        }

        if step.is_skipped() {
            debug!("Skipping step {}", name);
            build.set_state(id, StepState::Skipped);
            self.emit(ExecutionEvent::StepSkipped { step: name.clone() });
            self.skipped.push(name);
            return Ok(());
        }

        if !step.has_own_work() {
            debug!("Step {} has nothing to do", name);
            let now = Utc::now();
            build.set_state(
                id,
                StepState::Succeeded {
                    started_at: now,
                    completed_at: Some(now),
                },
            );
            return Ok(());
        }

        let before: Vec<BoxedAction> = step.before_hooks().to_vec();
        let operation: Option<BoxedAction> = step.operation().cloned();
        let after: Vec<BoxedAction> = step.after_hooks().to_vec();

        info!("Running step {}", name);
        self.emit(ExecutionEvent::StepStarted { step: name.clone() });
        let timer = Instant::now();
        let started_at = Utc::now();

        for (i, hook) in before.iter().enumerate() {
            if let Err(e) = self.invoke(&name, ActionKind::BeforeHook(i), hook, ctx).await {
                return Err(self.fail(build, id, &name, e));
            }
        }

        // Marked before the operation so nothing re-enters this step while
        // it runs; a failure below still flips it to Failed.
        build.set_state(
            id,
            StepState::Succeeded {
                started_at,
                completed_at: None,
            },
        );

        if let Some(operation) = &operation {
            if let Err(e) = self.invoke(&name, ActionKind::Operation, operation, ctx).await {
                return Err(self.fail(build, id, &name, e));
            }
        }

        for (i, hook) in after.iter().enumerate() {
            if let Err(e) = self.invoke(&name, ActionKind::AfterHook(i), hook, ctx).await {
                return Err(self.fail(build, id, &name, e));
            }
        }

        build.set_state(
            id,
            StepState::Succeeded {
                started_at,
                completed_at: Some(Utc::now()),
            },
        );

        let duration = timer.elapsed();
        info!("Step {} finished in {:?}", name, duration);
        self.emit(ExecutionEvent::StepCompleted {
            step: name.clone(),
            duration,
        });
        self.executed.push(name);
        Ok(())
    }

    async fn invoke(
        &self,
        step: &str,
        kind: ActionKind,
        action: &BoxedAction,
        ctx: &RunContext,
    ) -> Result<(), ActionError> {
        ctx.check()?;

        if self.dry_run {
            debug!("Dry run: would run {} of {}", kind, step);
            self.emit(ExecutionEvent::ActionPlanned {
                step: step.to_string(),
                kind,
            });
            return Ok(());
        }

        debug!("Running {} of {}", kind, step);
        action.run(ctx).await
    }

    fn fail(&self, build: &mut Build, id: StepId, step: &str, err: ActionError) -> RunError {
        error!("Step {} failed: {}", step, err);
        build.set_state(
            id,
            StepState::Failed {
                error: err.to_string(),
                failed_at: Utc::now(),
            },
        );
        self.emit(ExecutionEvent::StepFailed {
            step: step.to_string(),
            error: err.to_string(),
        });
        RunError::from_action(step, err)
    }
}
