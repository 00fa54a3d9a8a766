//! Command-line interface

pub mod commands;
pub mod output;

use crate::{
    core::{Build, RunContext},
    execution::{ExecutionEngine, Outcome},
};
use anyhow::Result;
use clap::Parser;
use commands::ExecuteArgs;
use output::{format_execution_event, format_report, style, CROSS};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, Level};
use tracing_subscriber::EnvFilter;

/// Run build steps defined in a build file
#[derive(Debug, Parser, Clone)]
#[command(name = "buildflow")]
#[command(version)]
#[command(about = "Run steps of a build graph defined in a YAML or JSON file", long_about = None)]
pub struct Cli {
    /// Path to the build file
    #[arg(short, long, default_value = "buildflow.yaml")]
    pub file: PathBuf,

    #[command(flatten)]
    pub execute: ExecuteArgs,
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

/// Arguments for a build defined in Rust code, with no build file
#[derive(Debug, Parser, Clone)]
#[command(version)]
pub struct EmbeddedCli {
    #[command(flatten)]
    pub execute: ExecuteArgs,
}

/// Entry point for a build-definition binary written in Rust
///
/// ```no_run
/// use buildflow::{action, cli, Build, StandardStep};
///
/// #[tokio::main]
/// async fn main() -> std::process::ExitCode {
///     let mut build = Build::new();
///     let test = build.standard(StandardStep::Test);
///     build.configure(test).does(action::noop());
///     cli::run_from_env(build).await
/// }
/// ```
pub async fn run_from_env(build: Build) -> ExitCode {
    let cli = EmbeddedCli::parse();
    execute(build, &cli.execute).await
}

/// Initialize the tracing subscriber
///
/// `RUST_LOG` takes precedence over the `debug` flag.
pub fn init_logging(debug: bool, no_color: bool) -> Result<()> {
    let level = if debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))
}

/// Resolve `args` against `build`, run it, and report the result
///
/// Ctrl-C cancels the run; the running action sees the cancellation.
pub async fn execute(mut build: Build, args: &ExecuteArgs) -> ExitCode {
    if args.no_color {
        console::set_colors_enabled(false);
    }
    if let Err(e) = init_logging(args.debug, args.no_color) {
        eprintln!("{} {}", CROSS, e);
    }

    let ctx = RunContext::new();
    let interrupt = ctx.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel("interrupted");
        }
    });

    let mut engine = ExecutionEngine::new();
    engine.add_event_handler(|event| {
        println!("{}", format_execution_event(&event));
    });

    let result = engine
        .execute(&mut build, &args.to_run_options(), &ctx)
        .await;
    watcher.abort();

    match result {
        Ok(Outcome::Graph(text)) | Ok(Outcome::Steps(text)) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Ok(Outcome::Completed(report)) => {
            println!("\n{}", format_report(&report));
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            eprintln!("\n{} {}", CROSS, style(e).red());
            ExitCode::FAILURE
        }
    }
}
