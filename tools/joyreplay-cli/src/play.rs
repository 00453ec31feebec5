//! Replay a recorded session

use anyhow::{Context, Result};
use clap::Args;
use joyreplay_core::config::ReplayConfig;

use crate::host::Host;
use crate::inspect::format_sample;

/// Arguments for the play command
#[derive(Args)]
pub struct PlayArgs {
    /// Session name; each channel plays <session>_<channel>
    pub session: String,

    /// Only print the summary, not every tick
    #[arg(long, short)]
    pub quiet: bool,
}

/// Execute the play command
pub fn execute(config: &ReplayConfig, args: PlayArgs) -> Result<()> {
    let mut host = Host::new(config, false)?;

    host.manager
        .start_playback_all(&args.session)
        .with_context(|| format!("Failed to start playback of '{}'", args.session))?;
    println!("Playing '{}'", args.session);

    let quiet = args.quiet;
    host.run_until_idle(|manager, report| {
        if !quiet {
            for channel in manager.channels() {
                println!(
                    "{:>6}  {:<8} {:<9} {}",
                    report.tick,
                    channel.name(),
                    channel.mode(),
                    format_sample(channel.current())
                );
            }
        }
        for (_, event) in &report.events {
            println!("  {}: {} samples", event.log(), event.samples());
        }
    });

    println!("=== Playback Complete ===");
    Ok(())
}
