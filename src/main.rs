//! Warmboot - offline-first resource cache and resilient bootstrap
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use warmboot::cli::{Cli, Commands};
use warmboot::config::ConfigManager;
use warmboot::error::WarmbootResult;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WarmbootResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config.general.log_format);
    debug!("Using config {}", config_manager.path().display());

    if cli.command.needs_network() {
        config_manager.validate(&config)?;
    }

    match cli.command {
        Commands::Install => warmboot::cli::commands::install(&config).await,
        Commands::Fetch(args) => warmboot::cli::commands::fetch(args, &config).await,
        Commands::Boot(args) => warmboot::cli::commands::boot(args, &config).await,
        Commands::Cache(args) => warmboot::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            warmboot::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// 0 = warn (spinners only), 1 = info, 2+ = debug; logs go to stderr
fn init_logging(verbose: u8, format: &str) {
    let filter = match verbose {
        0 => EnvFilter::new("warmboot=warn"),
        1 => EnvFilter::new("warmboot=info"),
        _ => EnvFilter::new("warmboot=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    if format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
