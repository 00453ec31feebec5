//! Joyreplay CLI - record and replay joystick sessions
//!
//! # Commands
//!
//! - `joyreplay list` - List recordings in the storage directory
//! - `joyreplay inspect` - Print the shape and samples of one recording
//! - `joyreplay record` - Record every configured channel for a fixed time
//! - `joyreplay play` - Replay a recorded session until it is exhausted
//!
//! # Usage
//!
//! ```bash
//! # Record 15 seconds on every channel (recording_1_drive, recording_1_util)
//! joyreplay record recording_1 --seconds 15
//!
//! # Replay it
//! joyreplay play recording_1
//!
//! # Dump one channel's log as JSON
//! joyreplay inspect recording_1_drive --json
//! ```
//!
//! # Configuration (config.toml)
//!
//! ```toml
//! [timing]
//! tick_rate = 50
//!
//! [storage]
//! base_dir = "/home/lvuser/joystickRecordings"
//!
//! [[channels]]
//! name = "drive"
//! gamepad = 0
//! ```

mod host;
mod inspect;
mod list;
mod play;
mod record;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use joyreplay_core::config::{self, ReplayConfig};

/// Joyreplay CLI - record and replay joystick sessions
#[derive(Parser)]
#[command(name = "joyreplay")]
#[command(about = "Record and replay joystick sessions")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List recordings in the storage directory
    List,

    /// Print the shape and samples of one recording
    Inspect(inspect::InspectArgs),

    /// Record every configured channel for a fixed time
    Record(record::RecordArgs),

    /// Replay a recorded session until it is exhausted
    Play(play::PlayArgs),
}

fn load_config(path: Option<&Path>) -> Result<ReplayConfig> {
    let config = match path {
        Some(path) => config::load_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => config::load(),
    };
    for problem in config.validate() {
        tracing::warn!("Config: {}", problem);
    }
    Ok(config)
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => list::execute(&config),
        Commands::Inspect(args) => inspect::execute(&config, args),
        Commands::Record(args) => record::execute(&config, args),
        Commands::Play(args) => play::execute(&config, args),
    }
}
