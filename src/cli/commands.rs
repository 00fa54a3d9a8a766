//! CLI argument definitions

use crate::execution::RunOptions;
use clap::Args;
use std::time::Duration;

/// Flags and targets understood by every buildflow entry point
#[derive(Debug, Args, Clone, Default)]
pub struct ExecuteArgs {
    /// Skip a step's own work (repeatable)
    #[arg(long, value_name = "STEP")]
    pub skip: Vec<String>,

    /// Run a step that is skipped by default (repeatable)
    #[arg(long, value_name = "STEP")]
    pub unskip: Vec<String>,

    /// Run only the named targets, not their dependencies
    #[arg(long)]
    pub only: bool,

    /// Cancel the run after this long, e.g. 500ms, 30s, 5m, 1h
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Show what would run without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Include steps without any work in `graph` and `steps`
    #[arg(short, long)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Steps to run in order, or `graph` / `steps`
    #[arg(required = true, value_name = "TARGET")]
    pub targets: Vec<String>,
}

impl ExecuteArgs {
    pub fn to_run_options(&self) -> RunOptions {
        RunOptions {
            targets: self.targets.clone(),
            skip: self.skip.clone(),
            unskip: self.unskip.clone(),
            only: self.only,
            timeout: self.timeout,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }
}
