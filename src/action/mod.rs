//! Actions - the units of work a step runs
//!
//! Everything the graph engine executes goes through the [`Action`] trait:
//! external tools, file helpers and plain closures alike.

pub mod combinators;
pub mod command;
pub mod error;

use crate::core::RunContext;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

pub use combinators::{Catch, Finally, Then};
pub use command::{CommandAction, CommandConfig, CommandLine};
pub use error::ActionError;

/// Trait for a unit of work - allows for different implementations
#[async_trait]
pub trait Action: Send + Sync {
    /// Run the action. Background work must be finished before returning.
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError>;
}

/// Shared, type-erased action
pub type BoxedAction = Arc<dyn Action>;

#[async_trait]
impl<A: Action + ?Sized> Action for Arc<A> {
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        (**self).run(ctx).await
    }
}

#[async_trait]
impl<A: Action + ?Sized> Action for Box<A> {
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        (**self).run(ctx).await
    }
}

/// Action backed by an async closure
pub struct FnAction<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Action for FnAction<F>
where
    F: Fn(RunContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        (self.f)(ctx.clone()).await
    }
}

/// Build an action from an async closure
///
/// ```no_run
/// use buildflow::action::{self, ActionError};
///
/// let hello = action::from_fn(|_ctx| async move {
///     println!("hello");
///     Ok::<(), ActionError>(())
/// });
/// ```
pub fn from_fn<F, Fut>(f: F) -> FnAction<F>
where
    F: Fn(RunContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), ActionError>> + Send,
{
    FnAction { f }
}

/// Action that always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOp;

#[async_trait]
impl Action for NoOp {
    async fn run(&self, _ctx: &RunContext) -> Result<(), ActionError> {
        Ok(())
    }
}

pub fn noop() -> NoOp {
    NoOp
}

/// Action that always fails with a fixed message
#[derive(Debug, Clone)]
pub struct Fail {
    message: String,
}

#[async_trait]
impl Action for Fail {
    async fn run(&self, _ctx: &RunContext) -> Result<(), ActionError> {
        Err(ActionError::Failed(self.message.clone()))
    }
}

pub fn fail(message: impl Into<String>) -> Fail {
    Fail {
        message: message.into(),
    }
}

/// Composition helpers available on every action
pub trait ActionExt: Action + Sized + 'static {
    /// Run `next` only if `self` succeeds
    fn then<B: Action + 'static>(self, next: B) -> Then<Self, B> {
        Then::new(self, next)
    }

    /// On failure, run the recovery action produced by `handler`
    fn catch<F, R>(self, handler: F) -> Catch<Self, F>
    where
        F: Fn(ActionError) -> R + Send + Sync + 'static,
        R: Action + 'static,
    {
        Catch::new(self, handler)
    }

    /// Always run the cleanup action produced by `cleanup`
    fn finally<F, R>(self, cleanup: F) -> Finally<Self, F>
    where
        F: Fn(Option<&ActionError>) -> R + Send + Sync + 'static,
        R: Action + 'static,
    {
        Finally::new(self, cleanup)
    }

    fn boxed(self) -> BoxedAction {
        Arc::new(self)
    }
}

impl<A: Action + Sized + 'static> ActionExt for A {}
