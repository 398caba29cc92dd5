//! Edge CLI - Command line tool for edge site bundles.
//!
//! Commands:
//! - `edge init` - Write a default edge.toml
//! - `edge config` - Inspect and validate configuration
//! - `edge shape` - Print the adapter's output shape
//! - `edge check` - Validate a build manifest against the adapter
//! - `edge deploy` - Check, fingerprint and record a deployment

mod commands;
mod config;
mod context;
mod output;
mod plan;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{CheckArgs, ConfigArgs, DeployArgs, InitArgs, ShapeArgs};

/// Edge CLI - Check and deploy sites to edge hosts
#[derive(Parser)]
#[command(name = "edge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Use JSON output format
    #[arg(long, global = true)]
    json: bool,

    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default edge.toml
    Init(InitArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Print the output shape the adapter accepts
    Shape(ShapeArgs),

    /// Validate a build against the adapter without deploying
    Check(CheckArgs),

    /// Deploy a checked bundle
    Deploy(DeployArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }

    // Setup output formatting
    let output = output::Output::new(cli.verbose, cli.json);

    // Load config
    let config_path = cli.config.as_deref();
    let ctx = match context::Context::load(config_path, output.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Init(args) => commands::init::run(args, &ctx).await,
        Commands::Config(args) => commands::config::run(args, &ctx).await,
        Commands::Shape(args) => commands::shape::run(args, &ctx).await,
        Commands::Check(args) => commands::check::run(args, &ctx).await,
        Commands::Deploy(args) => commands::deploy::run(args, &ctx).await,
    };

    if let Err(e) = result {
        ctx.output.error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
