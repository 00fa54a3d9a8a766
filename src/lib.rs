//! buildflow - a build orchestration library with a dependency-graph engine

pub mod action;
pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use crate::action::{Action, ActionError, ActionExt, BoxedAction, CommandAction, CommandConfig};
pub use crate::core::{
    Build, BuildConfig, ConfigError, ExecutionStatus, RunContext, RunError, StandardStep, Step,
    StepId, StepMut, StepState,
};
pub use crate::execution::{ExecutionEngine, ExecutionEvent, Outcome, RunOptions, RunReport};
