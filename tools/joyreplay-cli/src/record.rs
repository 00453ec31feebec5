//! Record every configured channel

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use joyreplay_core::config::ReplayConfig;
use joyreplay_core::log_store::{pending_syncs, wait_for_syncs};

use crate::host::Host;

/// How long to wait for closed recordings to reach the disk before exiting
const SYNC_TIMEOUT: Duration = Duration::from_secs(10);

/// Arguments for the record command
#[derive(Args)]
pub struct RecordArgs {
    /// Session name; each channel records to <session>_<channel>
    pub session: String,

    /// Recording length in seconds
    #[arg(long, default_value_t = 15.0)]
    pub seconds: f64,
}

/// Execute the record command
pub fn execute(config: &ReplayConfig, args: RecordArgs) -> Result<()> {
    let duration = Duration::try_from_secs_f64(args.seconds)
        .with_context(|| format!("Invalid duration: {}s", args.seconds))?;
    let mut host = Host::new(config, true)?;

    host.manager
        .start_recording_all(&args.session, duration)
        .with_context(|| format!("Failed to start recording '{}'", args.session))?;
    println!(
        "Recording '{}' for {:.2}s ({} ticks)",
        args.session,
        args.seconds,
        host.manager.timing().ticks_for(duration)?
    );

    let mut failed = false;
    host.run_until_idle(|_, report| {
        for (_, event) in &report.events {
            failed |= event.error().is_some();
            println!("  {}: {} samples", event.log(), event.samples());
        }
    });

    if !wait_for_syncs(SYNC_TIMEOUT) {
        tracing::warn!(
            "{} recording(s) still syncing after {:?}",
            pending_syncs(),
            SYNC_TIMEOUT
        );
    }

    if failed {
        anyhow::bail!("Recording '{}' did not complete", args.session);
    }
    println!("=== Recording Complete ===");
    Ok(())
}
