//! CLI command implementations.

pub mod check;
pub mod config;
pub mod deploy;
pub mod init;
pub mod shape;

use clap::{Args, Subcommand};

/// Arguments for the init command.
#[derive(Args)]
pub struct InitArgs {
    /// Site name (default: current directory name).
    pub name: Option<String>,

    /// Overwrite an existing edge.toml.
    #[arg(short, long)]
    pub force: bool,
}

/// Arguments for the shape command.
#[derive(Args)]
pub struct ShapeArgs {
    /// Environment whose overrides apply.
    #[arg(short, long)]
    pub env: Option<String>,
}

/// Arguments for the check command.
#[derive(Args)]
pub struct CheckArgs {
    /// Build manifest (default: deploy.manifest from config).
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Environment whose overrides apply.
    #[arg(short, long)]
    pub env: Option<String>,
}

/// Arguments for the deploy command.
#[derive(Args)]
pub struct DeployArgs {
    /// Build manifest (default: deploy.manifest from config).
    #[arg(short, long)]
    pub manifest: Option<String>,

    /// Environment to deploy to.
    #[arg(short, long, default_value = "production")]
    pub env: String,

    /// Skip confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,

    /// Dry run (check and fingerprint, write nothing).
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Get a config value.
    Get {
        /// Config key (dot-separated).
        key: String,
    },
    /// Validate the config file.
    Validate,
}
