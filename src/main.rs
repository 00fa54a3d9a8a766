use anyhow::{Context, Result};
use buildflow::cli::{self, Cli};
use buildflow::core::BuildConfig;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::from_args();

    let build = BuildConfig::load_build(&cli.file)
        .with_context(|| format!("Failed to load build file {}", cli.file.display()))?;

    Ok(cli::execute(build, &cli.execute).await)
}
