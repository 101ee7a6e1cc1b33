//! RecipeSync CLI - Command-line interface for RecipeSync
//!
//! Provides commands for:
//! - Discovering devices on the local network
//! - Inspecting lock ownership and update precedence
//! - Pushing and pulling the recipe database and images
//! - Managing configuration

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod context;
mod output;

use commands::{
    compare::CompareCommand,
    config::ConfigCommand,
    discover::DiscoverCommand,
    images::ImagesCommand,
    lock::{LockCommand, UnlockCommand},
    shares::SharesCommand,
    status::StatusCommand,
    transfer::{PullCommand, PushCommand},
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "recipesync", version, about = "Recipe catalog synchronization")]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan the local network for reachable devices
    Discover(DiscoverCommand),
    /// List shares on the data store host
    Shares(SharesCommand),
    /// Show lock ownership and update precedence
    Status(StatusCommand),
    /// Acquire the store lock
    Lock(LockCommand),
    /// Release the store lock
    Unlock(UnlockCommand),
    /// Compare update markers between device and store
    Compare(CompareCommand),
    /// Publish this device's database and images to the store
    Push(PushCommand),
    /// Apply the store's database and images to this device
    Pull(PullCommand),
    /// Manage the image set
    #[command(subcommand)]
    Images(ImagesCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    match cli.command {
        Commands::Discover(cmd) => cmd.execute(format).await,
        Commands::Shares(cmd) => cmd.execute(format).await,
        Commands::Status(cmd) => cmd.execute(format).await,
        Commands::Lock(cmd) => cmd.execute(format).await,
        Commands::Unlock(cmd) => cmd.execute(format).await,
        Commands::Compare(cmd) => cmd.execute(format).await,
        Commands::Push(cmd) => cmd.execute(format).await,
        Commands::Pull(cmd) => cmd.execute(format).await,
        Commands::Images(cmd) => cmd.execute(format).await,
        Commands::Config(cmd) => cmd.execute(format).await,
    }
}
