//! List recordings in the storage directory

use anyhow::{Context, Result};
use joyreplay_core::config::ReplayConfig;
use joyreplay_core::{FsLogStore, LogStore};

/// Execute the list command
pub fn execute(config: &ReplayConfig) -> Result<()> {
    let store = FsLogStore::from_config(&config.storage);
    let names = store.list().context("Failed to list recordings")?;

    println!("Recordings in {}:", store.base_dir().display());
    if names.is_empty() {
        println!("  (none)");
        return Ok(());
    }

    for name in &names {
        match store.read_header(name) {
            Ok(header) => println!("  {:<32} {}", name, header.shape),
            Err(e) => println!("  {:<32} unreadable: {}", name, e),
        }
    }
    Ok(())
}
