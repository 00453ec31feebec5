//! Fixed-rate control loop shared by `record` and `play`

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use joyreplay_core::config::ReplayConfig;
use joyreplay_core::{FsLogStore, LiveInput, NeutralInput, SessionManager, TickReport};

#[cfg(feature = "gamepad")]
use joyreplay_core::live::GamepadHub;

/// Stick deflection ignored as noise
#[cfg(feature = "gamepad")]
const GAMEPAD_DEADZONE: f32 = 0.1;

pub struct Host {
    pub manager: SessionManager,
    #[cfg(feature = "gamepad")]
    gamepads: Option<GamepadHub>,
}

impl Host {
    /// Build the session manager for every configured channel.
    ///
    /// With `ensure_dir`, the storage directory is created if missing.
    pub fn new(config: &ReplayConfig, ensure_dir: bool) -> Result<Self> {
        let store = FsLogStore::from_config(&config.storage);
        if ensure_dir {
            store.ensure_base_dir().with_context(|| {
                format!(
                    "Failed to create recordings directory: {}",
                    store.base_dir().display()
                )
            })?;
        }

        #[cfg(feature = "gamepad")]
        let gamepads = {
            let slots = config
                .channels
                .iter()
                .filter_map(|c| c.gamepad)
                .max()
                .map_or(0, |slot| slot + 1);
            GamepadHub::new(slots, GAMEPAD_DEADZONE)
        };

        let manager = SessionManager::from_config(config, Arc::new(store), |channel| {
            #[cfg(feature = "gamepad")]
            if let (Some(hub), Some(slot)) = (&gamepads, channel.gamepad)
                && let Some(input) = hub.input(slot)
            {
                return Box::new(input) as Box<dyn LiveInput>;
            }
            tracing::debug!("Channel '{}' has no live input", channel.name);
            Box::new(NeutralInput)
        })
        .context("Invalid channel configuration")?;

        Ok(Self {
            manager,
            #[cfg(feature = "gamepad")]
            gamepads,
        })
    }

    /// Tick at the configured rate until every channel is idle.
    ///
    /// `on_tick` sees each report after the channels have advanced.
    pub fn run_until_idle(&mut self, mut on_tick: impl FnMut(&SessionManager, &TickReport)) {
        let period = self.manager.timing().tick_period();
        let mut next = Instant::now();

        while !self.manager.all_idle() {
            #[cfg(feature = "gamepad")]
            if let Some(hub) = &mut self.gamepads {
                hub.poll();
            }

            let report = self.manager.tick();
            for (id, event) in &report.events {
                if let Some(error) = event.error() {
                    tracing::warn!("Channel {}: '{}' ended early: {}", id, event.log(), error);
                }
            }
            on_tick(&self.manager, &report);

            next += period;
            let now = Instant::now();
            if next > now {
                std::thread::sleep(next - now);
            } else {
                // Fell behind; don't try to catch up with a burst of ticks
                next = now;
            }
        }
    }
}
