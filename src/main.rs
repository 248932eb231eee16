//! fxchain CLI - Real-Time Effect Chain
//!
//! Command-line interface for the fxchain effect processor.

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use fxchain::cli::{commands, Cli, Commands, RunArgs};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG overrides the default filter
    let default_filter = if cli.verbose { "fxchain=debug,info" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("fxchain v{}", env!("CARGO_PKG_VERSION"));

    let config = cli.engine_config().context("invalid configuration")?;

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(_) => commands::run(&config).context("live session failed"),
        Commands::Render {
            input,
            output,
            enable,
            ..
        } => commands::render(&config, &input, &output, &enable)
            .with_context(|| format!("failed to render {}", input.display())),
        Commands::Devices => commands::devices().context("failed to list devices"),
    }
}
