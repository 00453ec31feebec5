//! Inspect one recording

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use joyreplay_core::config::ReplayConfig;
use joyreplay_core::log_store::read_all;
use joyreplay_core::{ChannelShape, FsLogStore, InputSnapshot, LogStore};

/// Arguments for the inspect command
#[derive(Args)]
pub struct InspectArgs {
    /// Log name, e.g. recording_1_drive
    pub name: String,

    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

/// Everything known about one log
#[derive(Debug, Serialize)]
struct LogSummary {
    name: String,
    version: u8,
    shape: ChannelShape,
    records: usize,
    samples: Vec<InputSnapshot>,
}

fn summarize(store: &dyn LogStore, name: &str) -> Result<LogSummary> {
    let header = store
        .read_header(name)
        .with_context(|| format!("Failed to open recording '{}'", name))?;
    let samples = read_all(store, name, header.shape)
        .with_context(|| format!("Failed to read recording '{}'", name))?;

    Ok(LogSummary {
        name: name.to_string(),
        version: header.version,
        shape: header.shape,
        records: samples.len(),
        samples,
    })
}

/// Execute the inspect command
pub fn execute(config: &ReplayConfig, args: InspectArgs) -> Result<()> {
    let store = FsLogStore::from_config(&config.storage);
    let summary = summarize(&store, &args.name)?;

    if args.json {
        let json = serde_json::to_string_pretty(&summary).context("Failed to serialize")?;
        println!("{}", json);
        return Ok(());
    }

    println!("=== {} ===", summary.name);
    println!("Format version: {}", summary.version);
    println!("Shape: {}", summary.shape);
    println!("Records: {}", summary.records);
    println!();
    for (tick, sample) in summary.samples.iter().enumerate() {
        println!("{:>6}  {}", tick + 1, format_sample(sample));
    }
    Ok(())
}

/// One line per sample: axes with 3 decimals, then pressed buttons as 1/0
pub fn format_sample(sample: &InputSnapshot) -> String {
    let axes: Vec<String> = sample.axes.iter().map(|a| format!("{:+.3}", a)).collect();
    let buttons: String = sample
        .buttons
        .iter()
        .map(|&b| if b { '1' } else { '0' })
        .collect();
    format!("[{}] {}", axes.join(" "), buttons)
}
