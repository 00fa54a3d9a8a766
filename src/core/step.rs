//! Step domain model

use crate::action::{Action, BoxedAction};
use crate::core::{error::ConfigError, state::StepState};
use std::fmt;
use std::sync::Arc;

/// Separator between an import prefix and the imported step name
pub const NAMESPACE_SEPARATOR: char = ':';

/// Description used when a step is created without one
pub const DEFAULT_DESCRIPTION: &str = "No description";

/// Index of a step inside its [`Build`](crate::core::Build)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub(crate) usize);

impl StepId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single named node in the build graph
#[derive(Clone)]
pub struct Step {
    /// Unique (within a build) lowercase name
    name: String,

    description: String,

    /// Steps that must run first, in declaration order
    pub(crate) dependencies: Vec<StepId>,

    operation: Option<BoxedAction>,
    before: Vec<BoxedAction>,
    after: Vec<BoxedAction>,

    /// Skip the operation and hooks, still honor dependencies
    skip: bool,

    /// Do not traverse dependencies at all
    skip_dependencies: bool,

    /// Runtime state for the current execution
    pub(crate) state: StepState,
}

impl Step {
    /// Create a step
    ///
    /// # Panics
    /// If the name is empty or contains [`NAMESPACE_SEPARATOR`].
    pub fn new(name: &str, description: &str) -> Self {
        match Self::try_new(name, description) {
            Ok(step) => step,
            Err(e) => panic!("{}", e),
        }
    }

    /// Create a step, reporting an invalid name as an error
    pub fn try_new(name: &str, description: &str) -> Result<Self, ConfigError> {
        let name = normalize_name(name)?;

        Ok(Step {
            name,
            description: description_or_default(description),
            dependencies: Vec::new(),
            operation: None,
            before: Vec::new(),
            after: Vec::new(),
            skip: false,
            skip_dependencies: false,
            state: StepState::NotRun,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn rename(&mut self, name: String) {
        self.name = name;
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dependencies(&self) -> &[StepId] {
        &self.dependencies
    }

    pub fn operation(&self) -> Option<&BoxedAction> {
        self.operation.as_ref()
    }

    pub fn before_hooks(&self) -> &[BoxedAction] {
        &self.before
    }

    pub fn after_hooks(&self) -> &[BoxedAction] {
        &self.after
    }

    pub fn state(&self) -> &StepState {
        &self.state
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn skips_dependencies(&self) -> bool {
        self.skip_dependencies
    }

    /// Whether this step itself has an operation or any hook
    pub fn has_own_work(&self) -> bool {
        self.operation.is_some() || !self.before.is_empty() || !self.after.is_empty()
    }

    /// Replace the description; an empty one falls back to the default
    pub fn describe(&mut self, description: &str) -> &mut Self {
        self.description = description_or_default(description);
        self
    }

    /// Set or replace the operation
    pub fn does<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.operation = Some(Arc::new(action));
        self
    }

    /// Set the operation if one is given; `None` keeps the current one
    pub fn does_opt(&mut self, action: Option<BoxedAction>) -> &mut Self {
        if let Some(action) = action {
            self.operation = Some(action);
        }
        self
    }

    /// Append a hook that runs before the operation
    pub fn before_run<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.before.push(Arc::new(action));
        self
    }

    /// Append a hook that runs after the operation
    pub fn after_run<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.after.push(Arc::new(action));
        self
    }

    pub fn skip(&mut self) -> &mut Self {
        self.skip = true;
        self
    }

    pub fn unskip(&mut self) -> &mut Self {
        self.skip = false;
        self
    }

    pub fn skip_dependencies(&mut self) -> &mut Self {
        self.skip_dependencies = true;
        self
    }

    pub fn with_dependencies(&mut self) -> &mut Self {
        self.skip_dependencies = false;
        self
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("has_operation", &self.operation.is_some())
            .field("before_hooks", &self.before.len())
            .field("after_hooks", &self.after.len())
            .field("skip", &self.skip)
            .field("skip_dependencies", &self.skip_dependencies)
            .field("state", &self.state)
            .finish()
    }
}

fn description_or_default(description: &str) -> String {
    let description = description.trim();
    if description.is_empty() {
        DEFAULT_DESCRIPTION.to_string()
    } else {
        description.to_string()
    }
}

/// Trim and lowercase a step name, rejecting empty names and separators
pub fn normalize_name(name: &str) -> Result<String, ConfigError> {
    let name = name.trim().to_lowercase();
    if name.is_empty() {
        return Err(ConfigError::EmptyName);
    }
    if name.contains(NAMESPACE_SEPARATOR) {
        return Err(ConfigError::InvalidName {
            name,
            separator: NAMESPACE_SEPARATOR,
        });
    }
    Ok(name)
}
