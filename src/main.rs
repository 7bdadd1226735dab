// ABOUTME: Entry point for the siteswap CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use siteswap::config;
use siteswap::error::Result;
use siteswap::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = if cli.json {
        OutputMode::Json
    } else if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };

    match run(cli, mode).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            Output::new(mode).error(&e.to_string());
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli, mode: OutputMode) -> Result<i32> {
    let output = Output::new(mode);
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init {
            site,
            root,
            artifact,
            force,
        } => {
            let cwd = env::current_dir()?;
            config::init_config(
                &cwd,
                site.as_deref(),
                root.as_deref(),
                artifact.as_deref(),
                force,
            )?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(0)
        }
        Commands::Update {
            site,
            artifact,
            force,
        } => {
            let config = commands::load_config(config_path)?;
            commands::update(config, &site, artifact.as_deref(), force, output).await
        }
        Commands::Status { site } => {
            let config = commands::load_config(config_path)?;
            commands::status(config, site.as_deref(), output).await?;
            Ok(0)
        }
        Commands::Rollback { site } => {
            let config = commands::load_config(config_path)?;
            commands::rollback(config, &site, output).await?;
            Ok(0)
        }
        Commands::Discard { site } => {
            let config = commands::load_config(config_path)?;
            commands::discard(config, &site, output)?;
            Ok(0)
        }
    }
}
