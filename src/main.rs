//! Tabeq CLI
//!
//! Command-line interface for the per-tab equalizer.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tabeq::cli::{commands, Cli, Commands};
use tabeq::config::EqConfig;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Tabeq v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => EqConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EqConfig::default(),
    };

    match cli.command {
        Some(cmd) => handle_command(&config, cmd),
        None => {
            println!("Tabeq v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(config: &EqConfig, cmd: Commands) -> anyhow::Result<()> {
    match cmd {
        Commands::Curve {
            eq,
            width,
            height,
            composite,
        } => commands::curve(config, &eq, width, height, composite),
        Commands::Freq { percent, hz } => commands::freq(percent, hz),
        Commands::Render {
            input,
            output,
            eq,
            bit_depth,
        } => commands::render(config, &input, &output, &eq, bit_depth),
        Commands::Simulate { url } => commands::simulate(config, &url),
    }
}
