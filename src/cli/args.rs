//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Warmboot - offline-first resource cache and resilient bootstrap
///
/// Caches an application's shell and dependencies per generation, serves
/// them when the network is gone, and loads the model with bounded retries.
#[derive(Parser, Debug)]
#[command(name = "warmboot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "WARMBOOT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install and activate the configured cache generation
    Install,

    /// Fetch one resource through the cache
    Fetch(FetchArgs),

    /// Prepare the cache and load the model with retries
    Boot(BootArgs),

    /// Inspect or clear cache generations
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

impl Commands {
    /// Commands that talk to the origin and need a usable configuration
    pub fn needs_network(&self) -> bool {
        matches!(self, Self::Install | Self::Fetch(_) | Self::Boot(_))
    }
}

/// Arguments for the fetch command
#[derive(Parser, Debug)]
pub struct FetchArgs {
    /// Path on the application origin or absolute URL
    pub resource: String,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Arguments for the boot command
#[derive(Parser, Debug)]
pub struct BootArgs {
    /// Restart a failed bootstrap up to N times without asking
    #[arg(long, default_value_t = 0)]
    pub retries: u32,

    /// Never ask whether to retry after a failure
    #[arg(long)]
    pub no_prompt: bool,
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cache generations
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the entries of one generation
    Info {
        /// Generation id (defaults to the configured generation)
        generation: Option<String>,
    },

    /// Delete every cache generation
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Check the configuration for problems
    Validate,
}
