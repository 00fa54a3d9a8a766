//! Build configuration from YAML or JSON

use crate::action::{ActionExt, BoxedAction, CommandConfig, CommandLine};
use crate::core::{normalize_name, Build, Step, StepId};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Top-level build file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Project name (informational)
    #[serde(default)]
    pub name: Option<String>,

    /// Sub-builds merged in under a prefix
    #[serde(default)]
    pub imports: Vec<ImportConfig>,

    /// Custom steps, or standard steps configured in place
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// Another build file merged in under `prefix`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    pub prefix: String,

    /// Path relative to the importing file
    pub file: PathBuf,

    /// Also make each standard step depend on its prefixed counterpart
    #[serde(default)]
    pub link: bool,
}

/// Step configuration as defined in the build file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Names of steps this step depends on, in order
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Commands forming the operation, run one after another
    #[serde(default)]
    pub run: Vec<CommandLine>,

    /// Commands appended as before-hooks
    #[serde(default)]
    pub before: Vec<CommandLine>,

    /// Commands appended as after-hooks
    #[serde(default)]
    pub after: Vec<CommandLine>,

    #[serde(default)]
    pub skip: bool,

    #[serde(default)]
    pub skip_dependencies: bool,
}

impl BuildConfig {
    /// Load a build file; `.json` files are read as JSON, anything else as YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read build file {}", path.display()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let config = if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        };
        config.with_context(|| format!("Invalid build file {}", path.display()))
    }

    /// Parse build configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: BuildConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse build configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: BuildConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate what can be checked without loading imports
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for step in &self.steps {
            let name = step.normalized_name()?;
            if !seen.insert(name.clone()) {
                anyhow::bail!("Duplicate step name: {}", name);
            }

            for line in step.run.iter().chain(&step.before).chain(&step.after) {
                if line.is_empty() {
                    anyhow::bail!("Step '{}' has an empty command", name);
                }
            }
        }

        let mut prefixes = HashSet::new();
        for import in &self.imports {
            let prefix = normalize_name(&import.prefix)
                .with_context(|| format!("Invalid import prefix '{}'", import.prefix))?;
            if !prefixes.insert(prefix.clone()) {
                anyhow::bail!("Duplicate import prefix: {}", prefix);
            }
        }

        Ok(())
    }

    /// Load a build file and everything it imports into a [`Build`]
    pub fn load_build<P: AsRef<Path>>(path: P) -> Result<Build> {
        let mut loading = Vec::new();
        load_recursive(path.as_ref(), &mut loading)
    }

    /// Turn this configuration into a [`Build`]
    ///
    /// Commands run in `base_dir`; imports are resolved relative to it.
    pub fn to_build(&self, base_dir: &Path) -> Result<Build> {
        let mut loading = Vec::new();
        self.build_in(base_dir, &mut loading)
    }

    fn build_in(&self, base_dir: &Path, loading: &mut Vec<PathBuf>) -> Result<Build> {
        let mut build = Build::new();

        for import in &self.imports {
            let path = base_dir.join(&import.file);
            let child = load_recursive(&path, loading)
                .with_context(|| format!("Failed to import '{}'", import.prefix))?;
            if import.link {
                build.try_import_and_link(&import.prefix, child)?;
            } else {
                build.try_import(&import.prefix, child)?;
            }
        }

        let commands = CommandConfig::new().with_working_dir(base_dir);

        // Register every step first so dependencies can refer forward
        let mut ids: Vec<StepId> = Vec::with_capacity(self.steps.len());
        for step in &self.steps {
            let name = step.normalized_name()?;
            let id = match build.step_ok(&name) {
                Some(id) => {
                    if let Some(description) = &step.description {
                        build.configure(id).describe(description);
                    }
                    id
                }
                None => build.try_add_step(Step::try_new(
                    &name,
                    step.description.as_deref().unwrap_or_default(),
                )?)?,
            };
            ids.push(id);
        }

        for (step, &id) in self.steps.iter().zip(&ids) {
            for dep in &step.depends_on {
                let dependency = build.step_ok(dep).with_context(|| {
                    format!("Step '{}' depends on unknown step '{}'", step.name, dep)
                })?;
                build.try_depends_on(id, dependency)?;
            }

            let mut handle = build.configure(id);
            handle.does_opt(sequence(&commands, &step.run));
            for line in &step.before {
                handle.before_run(commands.command(line.clone()));
            }
            for line in &step.after {
                handle.after_run(commands.command(line.clone()));
            }
            if step.skip {
                handle.skip();
            }
            if step.skip_dependencies {
                handle.skip_dependencies();
            }
        }

        debug!(
            "Loaded build {} with {} steps",
            self.name.as_deref().unwrap_or("<unnamed>"),
            build.steps().len()
        );
        Ok(build)
    }
}

impl StepConfig {
    fn normalized_name(&self) -> Result<String> {
        normalize_name(&self.name).with_context(|| format!("Invalid step name '{}'", self.name))
    }
}

fn load_recursive(path: &Path, loading: &mut Vec<PathBuf>) -> Result<Build> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve build file {}", path.display()))?;
    if loading.contains(&canonical) {
        anyhow::bail!("Build file {} imports itself", canonical.display());
    }

    let config = BuildConfig::from_file(&canonical)?;
    let base_dir = canonical
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    loading.push(canonical);
    let build = config.build_in(&base_dir, loading);
    loading.pop();
    build
}

/// Chain commands into one operation; `None` when there are none
fn sequence(commands: &CommandConfig, lines: &[CommandLine]) -> Option<BoxedAction> {
    let mut lines = lines.iter();
    let first = commands.command(lines.next()?.clone()).boxed();
    Some(lines.fold(first, |acc, line| {
        acc.then(commands.command(line.clone())).boxed()
    }))
}
