//! Execution state models

use chrono::{DateTime, Utc};

/// Phase of one driver invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Nothing has happened yet
    Idle,
    /// Applying skip/unskip overrides and looking up targets
    ResolvingFlags,
    /// Validating the whole graph before anything runs
    CycleChecking,
    /// Printing the graph or the step list
    Listing,
    /// Running the requested targets
    RunningTargets,
    /// Finished successfully
    Done,
    /// Stopped on the first unrecoverable error
    Failed,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExecutionStatus::Done | ExecutionStatus::Failed)
    }
}

/// Run state of a single step
///
/// Only moves forward within one execution: `NotRun` to one of the others.
#[derive(Debug, Clone, PartialEq)]
pub enum StepState {
    NotRun,
    /// The step's own work was skipped; its dependencies may still have run
    Skipped,
    /// Marked before the operation runs; `completed_at` is set once the
    /// after-hooks finish
    Succeeded {
        started_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    },
    Failed {
        error: String,
        failed_at: DateTime<Utc>,
    },
}

impl StepState {
    pub fn is_not_run(&self) -> bool {
        matches!(self, StepState::NotRun)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepState::Failed { .. })
    }

    /// Whether the step is done and counts as a success
    pub fn is_success(&self) -> bool {
        matches!(self, StepState::Skipped | StepState::Succeeded { .. })
    }
}

impl Default for StepState {
    fn default() -> Self {
        StepState::NotRun
    }
}
