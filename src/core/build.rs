//! Build - the registry of named steps and their dependency graph

use crate::action::Action;
use crate::core::{
    error::{ConfigError, RunError},
    graph,
    state::StepState,
    step::{normalize_name, Step, StepId, NAMESPACE_SEPARATOR},
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Pseudo-target that prints the dependency tree
pub const GRAPH_COMMAND: &str = "graph";

/// Pseudo-target that prints the step list
pub const STEPS_COMMAND: &str = "steps";

/// The six pre-wired pipeline stages every build starts with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardStep {
    Tools,
    Generate,
    Test,
    Benchmark,
    Build,
    Package,
}

impl StandardStep {
    /// In pipeline order; each stage depends on the one before it
    pub const ALL: [StandardStep; 6] = [
        StandardStep::Tools,
        StandardStep::Generate,
        StandardStep::Test,
        StandardStep::Benchmark,
        StandardStep::Build,
        StandardStep::Package,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StandardStep::Tools => "tools",
            StandardStep::Generate => "generate",
            StandardStep::Test => "test",
            StandardStep::Benchmark => "benchmark",
            StandardStep::Build => "build",
            StandardStep::Package => "package",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StandardStep::Tools => "Install required tools",
            StandardStep::Generate => "Generate code and assets",
            StandardStep::Test => "Run tests",
            StandardStep::Benchmark => "Run benchmarks",
            StandardStep::Build => "Build the project",
            StandardStep::Package => "Package build artifacts",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Whether a name is unavailable for custom top-level steps
pub fn is_reserved(name: &str) -> bool {
    name == GRAPH_COMMAND || name == STEPS_COMMAND || StandardStep::from_name(name).is_some()
}

/// A set of named steps
///
/// Steps live in an arena owned by the build and refer to each other by
/// [`StepId`]. A step shared by several dependents is stored once. Steps can
/// sit in the arena without a name in the registry ("detached"); they become
/// registered as soon as a registered step depends on them.
#[derive(Debug, Clone)]
pub struct Build {
    steps: Vec<Step>,

    /// Normalized name -> step
    registry: HashMap<String, StepId>,

    standard: [StepId; 6],
}

impl Build {
    /// Create a build with the standard steps wired
    /// tools <- generate <- test <- benchmark <- build <- package
    ///
    /// `benchmark` is skipped unless requested explicitly.
    pub fn new() -> Self {
        let mut build = Build {
            steps: Vec::with_capacity(StandardStep::ALL.len()),
            registry: HashMap::new(),
            standard: [StepId(0); 6],
        };

        let mut previous: Option<StepId> = None;
        for standard in StandardStep::ALL {
            let id = build.push(Step::new(standard.name(), standard.description()));
            build.registry.insert(standard.name().to_string(), id);
            build.standard[standard.index()] = id;
            if let Some(prev) = previous {
                build.steps[id.0].dependencies.push(prev);
            }
            previous = Some(id);
        }
        let benchmark = build.standard(StandardStep::Benchmark);
        build.steps[benchmark.0].skip();

        build
    }

    /// Id of a standard step
    pub fn standard(&self, step: StandardStep) -> StepId {
        self.standard[step.index()]
    }

    /// Register a new step
    ///
    /// # Panics
    /// If the name is reserved or already registered.
    pub fn add_step(&mut self, step: Step) -> StepId {
        match self.try_add_step(step) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    /// Register a new step, reporting a bad name as an error
    ///
    /// The step must not carry dependencies yet; they are ids into some
    /// other build's arena. Wire them with [`Build::depends_on`] instead.
    pub fn try_add_step(&mut self, step: Step) -> Result<StepId, ConfigError> {
        let name = normalize_name(step.name())?;
        if is_reserved(&name) {
            return Err(ConfigError::ReservedName(name));
        }
        if self.registry.contains_key(&name) {
            return Err(ConfigError::DuplicateStep(name));
        }
        if !step.dependencies.is_empty() {
            return Err(ConfigError::PrewiredStep(name));
        }

        let id = self.push(step);
        self.registry.insert(name, id);
        debug!("Registered step {}", self.steps[id.0].name());
        Ok(id)
    }

    /// Create, register and return a handle to a new step
    pub fn new_step(&mut self, name: &str, description: &str) -> StepMut<'_> {
        let id = self.add_step(Step::new(name, description));
        self.configure(id)
    }

    /// Put a step in the arena without registering its name
    ///
    /// # Panics
    /// If the step already carries dependencies.
    pub fn add_detached(&mut self, step: Step) -> StepId {
        match self.try_add_detached(step) {
            Ok(id) => id,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_add_detached(&mut self, step: Step) -> Result<StepId, ConfigError> {
        if !step.dependencies.is_empty() {
            return Err(ConfigError::PrewiredStep(step.name().to_string()));
        }
        Ok(self.push(step))
    }

    /// Look up a registered step
    ///
    /// # Panics
    /// If no step with that name is registered.
    pub fn step(&self, name: &str) -> StepId {
        match self.step_ok(name) {
            Some(id) => id,
            None => panic!("{}", ConfigError::UnknownStep(name.to_string())),
        }
    }

    pub fn step_ok(&self, name: &str) -> Option<StepId> {
        self.registry.get(&name.trim().to_lowercase()).copied()
    }

    /// All registered names, sorted
    pub fn steps(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether the step has a name in the registry
    pub fn is_registered(&self, id: StepId) -> bool {
        self.steps
            .get(id.0)
            .is_some_and(|step| self.registry.get(step.name()) == Some(&id))
    }

    /// # Panics
    /// If `id` does not belong to this build.
    pub fn get(&self, id: StepId) -> &Step {
        match self.steps.get(id.0) {
            Some(step) => step,
            None => panic!("{}", ConfigError::ForeignStep(id.0)),
        }
    }

    pub fn try_get(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.0)
    }

    /// # Panics
    /// If `id` does not belong to this build.
    pub fn get_mut(&mut self, id: StepId) -> &mut Step {
        match self.steps.get_mut(id.0) {
            Some(step) => step,
            None => panic!("{}", ConfigError::ForeignStep(id.0)),
        }
    }

    /// Chainable configuration handle for a step
    pub fn configure(&mut self, id: StepId) -> StepMut<'_> {
        self.get(id);
        StepMut { build: self, id }
    }

    /// Every step in the arena, registered or not
    pub fn iter(&self) -> impl Iterator<Item = (StepId, &Step)> {
        self.steps.iter().enumerate().map(|(i, s)| (StepId(i), s))
    }

    /// Make `id` depend on `dependency`
    ///
    /// # Panics
    /// If either id is foreign, or registering the dependency clashes with an
    /// existing name.
    pub fn depends_on(&mut self, id: StepId, dependency: StepId) {
        if let Err(e) = self.try_depends_on(id, dependency) {
            panic!("{}", e);
        }
    }

    pub fn try_depends_on(&mut self, id: StepId, dependency: StepId) -> Result<(), ConfigError> {
        if self.try_get(id).is_none() {
            return Err(ConfigError::ForeignStep(id.0));
        }
        if self.try_get(dependency).is_none() {
            return Err(ConfigError::ForeignStep(dependency.0));
        }

        if self.is_registered(id) {
            self.register_detached(dependency)?;
        }
        self.steps[id.0].dependencies.push(dependency);
        Ok(())
    }

    /// Wrap `action` in a fresh step and make `id` depend on it
    pub fn depends_on_runner<A: Action + 'static>(
        &mut self,
        id: StepId,
        name: &str,
        description: &str,
        action: A,
    ) -> StepId {
        let mut step = Step::new(name, description);
        step.does(action);
        let dependency = self.add_detached(step);
        self.depends_on(id, dependency);
        dependency
    }

    /// Merge another build's steps under `prefix`
    ///
    /// Every step `x` of `other` becomes `prefix:x`. Existing edges inside
    /// `other` are kept; no edges to this build's steps are added.
    ///
    /// # Panics
    /// If the prefix is invalid or a prefixed name already exists.
    pub fn import(&mut self, prefix: &str, other: Build) -> Vec<StepId> {
        match self.try_import(prefix, other) {
            Ok(ids) => ids,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_import(&mut self, prefix: &str, other: Build) -> Result<Vec<StepId>, ConfigError> {
        let prefix = normalize_name(prefix)?;
        let prefixed = |name: &str| format!("{}{}{}", prefix, NAMESPACE_SEPARATOR, name);

        if let Some(clash) = other
            .registry
            .keys()
            .map(|name| prefixed(name.as_str()))
            .find(|name| self.registry.contains_key(name))
        {
            return Err(ConfigError::DuplicateStep(clash));
        }

        let offset = self.steps.len();
        let Build {
            steps, registry, ..
        } = other;

        for mut step in steps {
            for dep in &mut step.dependencies {
                dep.0 += offset;
            }
            let name = prefixed(step.name());
            step.rename(name);
            self.steps.push(step);
        }

        let mut imported: Vec<StepId> = registry
            .into_values()
            .map(|id| StepId(id.0 + offset))
            .collect();
        imported.sort_unstable();
        for &id in &imported {
            self.registry.insert(self.steps[id.0].name().to_string(), id);
        }

        debug!("Imported {} steps under prefix {}", imported.len(), prefix);
        Ok(imported)
    }

    /// Import `other` and make each standard step depend on its prefixed
    /// counterpart, e.g. `build` on `prefix:build`
    pub fn import_and_link(&mut self, prefix: &str, other: Build) -> Vec<StepId> {
        match self.try_import_and_link(prefix, other) {
            Ok(ids) => ids,
            Err(e) => panic!("{}", e),
        }
    }

    pub fn try_import_and_link(
        &mut self,
        prefix: &str,
        other: Build,
    ) -> Result<Vec<StepId>, ConfigError> {
        let imported = self.try_import(prefix, other)?;
        let prefix = normalize_name(prefix)?;
        for standard in StandardStep::ALL {
            let name = format!("{}{}{}", prefix, NAMESPACE_SEPARATOR, standard.name());
            let theirs = self
                .step_ok(&name)
                .ok_or(ConfigError::UnknownStep(name))?;
            self.try_depends_on(self.standard(standard), theirs)?;
        }
        Ok(imported)
    }

    /// Fail with the offending path if any step transitively depends on itself
    pub fn check_cycles(&self) -> Result<(), RunError> {
        match graph::find_cycle(self) {
            Some(path) => Err(RunError::Cycle {
                path: path
                    .iter()
                    .map(|id| self.steps[id.0].name())
                    .collect::<Vec<_>>()
                    .join(" -> "),
            }),
            None => Ok(()),
        }
    }

    /// Whether the step or anything it depends on has an operation or hook
    pub fn has_operation(&self, id: StepId) -> bool {
        graph::operation_map(self)[id.0]
    }

    /// Return every step to `NotRun`
    pub fn reset_states(&mut self) {
        for step in &mut self.steps {
            step.state = StepState::NotRun;
        }
    }

    pub(crate) fn set_state(&mut self, id: StepId, state: StepState) {
        self.steps[id.0].state = state;
    }

    fn push(&mut self, step: Step) -> StepId {
        self.steps.push(step);
        StepId(self.steps.len() - 1)
    }

    /// Register `id` and everything it depends on that is still detached
    ///
    /// All names are checked before any is inserted, so on error the
    /// registry is unchanged.
    fn register_detached(&mut self, id: StepId) -> Result<(), ConfigError> {
        let mut seen = vec![false; self.steps.len()];
        let mut pending = vec![id];
        let mut found: Vec<(String, StepId)> = Vec::new();

        while let Some(next) = pending.pop() {
            if seen[next.0] || self.is_registered(next) {
                continue;
            }
            seen[next.0] = true;

            let name = normalize_name(self.steps[next.0].name())?;
            if is_reserved(&name) {
                return Err(ConfigError::ReservedName(name));
            }
            if self.registry.contains_key(&name) || found.iter().any(|(n, _)| *n == name) {
                return Err(ConfigError::DuplicateStep(name));
            }
            found.push((name, next));
            pending.extend(self.steps[next.0].dependencies.iter().copied());
        }

        for (name, id) in found {
            debug!("Registering dependency {}", name);
            self.registry.insert(name, id);
        }
        Ok(())
    }
}

impl Default for Build {
    fn default() -> Self {
        Self::new()
    }
}

/// Chainable configuration handle returned by [`Build::configure`]
pub struct StepMut<'a> {
    build: &'a mut Build,
    id: StepId,
}

impl<'a> StepMut<'a> {
    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn step(&self) -> &Step {
        self.build.get(self.id)
    }

    pub fn depends_on(&mut self, dependency: StepId) -> &mut Self {
        self.build.depends_on(self.id, dependency);
        self
    }

    /// Depend on a registered step by name
    pub fn depends_on_name(&mut self, name: &str) -> &mut Self {
        let dependency = self.build.step(name);
        self.depends_on(dependency)
    }

    pub fn depends_on_runner<A: Action + 'static>(
        &mut self,
        name: &str,
        description: &str,
        action: A,
    ) -> &mut Self {
        self.build.depends_on_runner(self.id, name, description, action);
        self
    }

    pub fn describe(&mut self, description: &str) -> &mut Self {
        self.build.get_mut(self.id).describe(description);
        self
    }

    pub fn does<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.build.get_mut(self.id).does(action);
        self
    }

    pub fn does_opt(&mut self, action: Option<Arc<dyn Action>>) -> &mut Self {
        self.build.get_mut(self.id).does_opt(action);
        self
    }

    pub fn before_run<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.build.get_mut(self.id).before_run(action);
        self
    }

    pub fn after_run<A: Action + 'static>(&mut self, action: A) -> &mut Self {
        self.build.get_mut(self.id).after_run(action);
        self
    }

    pub fn skip(&mut self) -> &mut Self {
        self.build.get_mut(self.id).skip();
        self
    }

    pub fn unskip(&mut self) -> &mut Self {
        self.build.get_mut(self.id).unskip();
        self
    }

    pub fn skip_dependencies(&mut self) -> &mut Self {
        self.build.get_mut(self.id).skip_dependencies();
        self
    }
}
