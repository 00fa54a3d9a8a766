//! Action error types

use thiserror::Error;

/// Error types for action execution
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{0}")]
    Failed(String),

    /// The run context was cancelled or its deadline passed
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// Both an action and its cleanup failed
    #[error("{}", join_messages(.0))]
    Multiple(Vec<ActionError>),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ActionError {
    /// Create a failure with a message
    pub fn failed(message: impl Into<String>) -> Self {
        ActionError::Failed(message.into())
    }

    /// Whether this error (or any error it aggregates) is a cancellation
    pub fn is_cancelled(&self) -> bool {
        match self {
            ActionError::Cancelled(_) => true,
            ActionError::Multiple(errors) => errors.iter().any(ActionError::is_cancelled),
            _ => false,
        }
    }

    /// The cancellation reason, if this is a cancellation
    pub fn cancellation_reason(&self) -> Option<&str> {
        match self {
            ActionError::Cancelled(reason) => Some(reason),
            ActionError::Multiple(errors) => errors.iter().find_map(ActionError::cancellation_reason),
            _ => None,
        }
    }

    /// Merge two failures, flattening nested aggregates
    pub fn join(self, other: ActionError) -> Self {
        let mut errors = Vec::new();
        for err in [self, other] {
            match err {
                ActionError::Multiple(inner) => errors.extend(inner),
                err => errors.push(err),
            }
        }
        ActionError::Multiple(errors)
    }
}

fn join_messages(errors: &[ActionError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
