//! Core domain models for buildflow
//!
//! This module defines the step graph, the registry that owns it, the
//! cancellable run context and the build file format.

pub mod build;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod state;
pub mod step;

pub use build::{is_reserved, Build, StandardStep, StepMut, GRAPH_COMMAND, STEPS_COMMAND};
pub use config::BuildConfig;
pub use context::*;
pub use error::{ConfigError, RunError};
pub use state::*;
pub use step::*;
