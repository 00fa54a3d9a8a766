//! Build execution engine

pub mod engine;
pub mod executor;

pub use engine::{EventHandler, ExecutionEngine, ExecutionEvent, Outcome, RunOptions, RunReport};
pub use executor::{ActionKind, StepExecutor};
