//! Run context - cancellation and deadlines shared by a whole run

use crate::action::ActionError;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Execution context threaded through every step and action of a run
///
/// Cloning is cheap; clones share the same cancellation state. A context
/// derived with [`RunContext::with_timeout`] also carries a deadline.
#[derive(Debug, Clone)]
pub struct RunContext {
    cancel: Arc<watch::Sender<Option<String>>>,
    deadline: Option<Deadline>,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl RunContext {
    /// Create a new context that is not cancelled and has no deadline
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            cancel: Arc::new(tx),
            deadline: None,
        }
    }

    /// Derive a context that also expires after `timeout`
    ///
    /// Cancelling either context cancels both. The earlier deadline wins. A
    /// timeout too large to represent as an instant sets no deadline.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let candidate = Instant::now()
            .checked_add(timeout)
            .map(|at| Deadline { at, timeout });
        let deadline = match (self.deadline, candidate) {
            (Some(existing), Some(candidate)) if candidate.at < existing.at => Some(candidate),
            (Some(existing), _) => Some(existing),
            (None, candidate) => candidate,
        };
        Self {
            cancel: Arc::clone(&self.cancel),
            deadline,
        }
    }

    /// Request cancellation. Only the first reason is kept.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.cancel.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        });
    }

    /// Whether cancellation was requested or the deadline has passed
    pub fn is_cancelled(&self) -> bool {
        self.cancel.borrow().is_some() || self.deadline_passed()
    }

    /// The cancellation reason, if any
    pub fn reason(&self) -> Option<String> {
        if let Some(reason) = self.cancel.borrow().clone() {
            return Some(reason);
        }
        self.deadline
            .filter(|_| self.deadline_passed())
            .map(|d| timeout_reason(d.timeout))
    }

    /// Return the cancellation error if this context is done
    pub fn check(&self) -> Result<(), ActionError> {
        match self.reason() {
            Some(reason) => Err(ActionError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Wait until the context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        let mut rx = self.cancel.subscribe();
        match self.deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = rx.wait_for(|reason| reason.is_some()) => {}
                    _ = tokio::time::sleep_until(deadline.at) => {}
                }
            }
            None => {
                // The sender lives as long as `self`, so this only returns on cancel
                let _ = rx.wait_for(|reason| reason.is_some()).await;
            }
        }
    }

    fn deadline_passed(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d.at)
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

fn timeout_reason(timeout: Duration) -> String {
    format!("timed out after {:?}", timeout)
}
