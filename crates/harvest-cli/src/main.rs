//! Harvest CLI - offline-first field capture client
//!
//! # Usage
//!
//! ```bash
//! # Queue a voice recording (works without connectivity)
//! harvest capture north-paddock.m4a --duration 42
//!
//! # How many captures are waiting?
//! harvest status
//!
//! # Upload everything that is pending
//! harvest sync --endpoint https://farm.example.com/api
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use harvest_persist::{SqliteConfig, SqliteQueueStore};

mod capture;
mod commands;
mod upload;

#[cfg(test)]
mod test_support;

use capture::CaptureMetadata;
use commands::{capture as capture_cmd, clear, status, sync};

/// Harvest - field notes, photos and voice recordings that survive bad signal
#[derive(Parser)]
#[command(
    name = "harvest",
    version,
    about = "Harvest CLI - offline capture queue for field work",
    long_about = "Captures are written to a local durable queue the moment they are taken,\n\
                  and uploaded later when a connection is available.\n\
                  A capture that keeps failing to upload is evicted and reported."
)]
struct Cli {
    /// Queue database URL
    #[arg(long, env = "HARVEST_DB_URL", global = true, default_value = "sqlite:harvest.db")]
    db: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Queue a captured file for upload
    #[command(name = "capture")]
    Capture(capture_cmd::CaptureArgs),

    /// Show the number of pending captures
    #[command(name = "status")]
    Status,

    /// List pending captures, oldest first
    #[command(name = "list")]
    List,

    /// Upload pending captures
    #[command(name = "sync")]
    Sync(sync::SyncArgs),

    /// Drop every pending capture
    #[command(name = "clear")]
    Clear(clear::ClearArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing based on verbosity
    setup_logging(cli.verbose);

    let config = SqliteConfig {
        url: cli.db.clone(),
        ..SqliteConfig::default()
    };
    let store: SqliteQueueStore<CaptureMetadata> = SqliteQueueStore::open(&config)
        .await
        .with_context(|| format!("Failed to open capture queue at {}", cli.db))?;

    match cli.command {
        Commands::Capture(args) => capture_cmd::run(&store, args).await,
        Commands::Status => status::count(&store).await,
        Commands::List => status::list(&store).await,
        Commands::Sync(args) => sync::run(store, args).await,
        Commands::Clear(args) => clear::run(&store, args).await,
    }
}

/// Setup logging based on verbosity level
fn setup_logging(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Print a success message with a checkmark
pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green().bold(), msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("{} {}", "⚠".yellow().bold(), msg);
}

/// Print an info message
pub fn print_info(msg: &str) {
    println!("{} {}", "ℹ".blue().bold(), msg);
}
