//! Error taxonomy for build configuration and execution
//!
//! [`ConfigError`] covers mistakes in the build definition. The panicking
//! APIs (`Build::add_step`, `Build::step`, ...) panic with its message; the
//! `try_` variants return it. [`RunError`] covers everything that can go
//! wrong once execution starts.

use crate::action::ActionError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("step name must not be empty")]
    EmptyName,

    #[error("step name `{name}` must not contain the namespace separator `{separator}`")]
    InvalidName { name: String, separator: char },

    #[error("step name `{0}` is reserved")]
    ReservedName(String),

    #[error("step `{0}` is already registered")]
    DuplicateStep(String),

    #[error("unknown step `{0}`")]
    UnknownStep(String),

    /// A step that already has dependencies from another build
    #[error("step `{0}` already has dependencies; add it first, then wire them")]
    PrewiredStep(String),

    /// A step id that does not belong to this build's arena
    #[error("step id {0} does not belong to this build")]
    ForeignStep(usize),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("dependency cycle detected: {path}")]
    Cycle { path: String },

    #[error("unknown step `{0}`")]
    UnknownStep(String),

    #[error("no targets given")]
    NoTargets,

    #[error("step `{step}` failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: ActionError,
    },

    #[error("step `{step}` cancelled: {reason}")]
    Cancelled { step: String, reason: String },

    #[error("step `{0}` already failed in this run")]
    PreviouslyFailed(String),
}

impl RunError {
    /// Wrap an action failure with the name of the step it belongs to
    pub fn from_action(step: impl Into<String>, error: ActionError) -> Self {
        let step = step.into();
        match error.cancellation_reason() {
            Some(reason) => RunError::Cancelled {
                step,
                reason: reason.to_string(),
            },
            None => RunError::StepFailed {
                step,
                source: error,
            },
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled { .. })
    }

    /// The step this error is attributed to, if any
    pub fn step(&self) -> Option<&str> {
        match self {
            RunError::StepFailed { step, .. }
            | RunError::Cancelled { step, .. }
            | RunError::PreviouslyFailed(step) => Some(step),
            RunError::UnknownStep(name) => Some(name),
            RunError::Cycle { .. } | RunError::NoTargets => None,
        }
    }
}
