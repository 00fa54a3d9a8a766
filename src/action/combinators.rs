//! Sequencing, recovery and cleanup combinators

use crate::action::{Action, ActionError};
use crate::core::RunContext;
use async_trait::async_trait;
use tracing::debug;

/// Runs `first`, then `next` if `first` succeeded
#[derive(Debug, Clone)]
pub struct Then<A, B> {
    first: A,
    next: B,
}

impl<A, B> Then<A, B> {
    pub fn new(first: A, next: B) -> Self {
        Self { first, next }
    }
}

#[async_trait]
impl<A: Action, B: Action> Action for Then<A, B> {
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        self.first.run(ctx).await?;
        ctx.check()?;
        self.next.run(ctx).await
    }
}

/// Runs `action`; on failure runs the recovery action built by `handler`
pub struct Catch<A, F> {
    action: A,
    handler: F,
}

impl<A, F> Catch<A, F> {
    pub fn new(action: A, handler: F) -> Self {
        Self { action, handler }
    }
}

#[async_trait]
impl<A, F, R> Action for Catch<A, F>
where
    A: Action,
    F: Fn(ActionError) -> R + Send + Sync,
    R: Action,
{
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        match self.action.run(ctx).await {
            Ok(()) => Ok(()),
            Err(err) => {
                debug!("Recovering from failure: {}", err);
                let recovery = (self.handler)(err);
                recovery.run(ctx).await
            }
        }
    }
}

/// Runs `action`, then always runs the cleanup built by `cleanup`
///
/// When both fail the result is an [`ActionError::Multiple`] holding the
/// original failure first.
pub struct Finally<A, F> {
    action: A,
    cleanup: F,
}

impl<A, F> Finally<A, F> {
    pub fn new(action: A, cleanup: F) -> Self {
        Self { action, cleanup }
    }
}

#[async_trait]
impl<A, F, R> Action for Finally<A, F>
where
    A: Action,
    F: Fn(Option<&ActionError>) -> R + Send + Sync,
    R: Action,
{
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        let outcome = self.action.run(ctx).await;
        let cleanup = (self.cleanup)(outcome.as_ref().err());
        let cleaned = cleanup.run(ctx).await;

        match (outcome, cleaned) {
            (Ok(()), Ok(())) => Ok(()),
            (Err(err), Ok(())) | (Ok(()), Err(err)) => Err(err),
            (Err(original), Err(cleanup_err)) => Err(original.join(cleanup_err)),
        }
    }
}
