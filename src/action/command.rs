//! External command action - runs a program as a subprocess

use crate::action::{Action, ActionError};
use crate::core::RunContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::{debug, warn};

/// Defaults applied to every command created from it
///
/// Passed explicitly to whoever builds command actions, so tests and
/// sub-builds can use different working directories side by side.
#[derive(Debug, Clone, Default)]
pub struct CommandConfig {
    /// Working directory for spawned programs (process cwd if not set)
    pub working_dir: Option<PathBuf>,

    /// Extra environment variables
    pub env: Vec<(String, String)>,
}

impl CommandConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Create a command action using these defaults
    pub fn command(&self, line: CommandLine) -> CommandAction {
        CommandAction {
            line,
            working_dir: self.working_dir.clone(),
            env: self.env.clone(),
        }
    }
}

/// A command line - either a string split on whitespace or an argv list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandLine {
    Shell(String),
    Argv(Vec<String>),
}

impl CommandLine {
    /// Program and arguments
    pub fn argv(&self) -> Vec<String> {
        match self {
            CommandLine::Shell(line) => line.split_whitespace().map(str::to_string).collect(),
            CommandLine::Argv(argv) => argv.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.argv().is_empty()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.argv().join(" "))
    }
}

/// Action that runs an external program and waits for it to exit
#[derive(Debug, Clone)]
pub struct CommandAction {
    line: CommandLine,
    working_dir: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl CommandAction {
    pub fn new(line: CommandLine) -> Self {
        CommandConfig::default().command(line)
    }

    pub fn line(&self) -> &CommandLine {
        &self.line
    }

    pub fn working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }
}

#[async_trait]
impl Action for CommandAction {
    /// Run the program with inherited stdio
    ///
    /// # Errors
    /// Returns `ActionError` if:
    /// - The command line is empty
    /// - The program cannot be spawned
    /// - The program exits with a non-zero status
    /// - The run context is cancelled first (the child is killed)
    async fn run(&self, ctx: &RunContext) -> Result<(), ActionError> {
        let argv = self.line.argv();
        let Some((program, args)) = argv.split_first() else {
            return Err(ActionError::failed("empty command line"));
        };

        debug!("Spawning `{}`", self.line);

        let mut command = Command::new(program);
        command.args(args).kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }

        let mut child = command.spawn().map_err(|e| {
            ActionError::Failed(format!("failed to spawn `{}`: {}", self.line, e))
        })?;

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = ctx.cancelled() => {
                warn!("Killing `{}`: run cancelled", self.line);
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill `{}`: {}", self.line, e);
                }
                return Err(ctx.check().err().unwrap_or_else(|| {
                    ActionError::Cancelled("cancelled".to_string())
                }));
            }
        };

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            return Err(ActionError::Failed(format!(
                "`{}` exited with code {}",
                self.line, exit_code
            )));
        }

        debug!("`{}` finished successfully", self.line);
        Ok(())
    }
}
