//! Joyreplay Core - joystick recorder and player
//!
//! Records the live state of one or more joysticks to durable logs, one sample
//! per control-loop tick, and replays those logs in place of live input with
//! the same timing.
//!
//! # Architecture
//!
//! - [`SampleCodec`] - Fixed-width binary encoding of one [`InputSnapshot`]
//! - [`LogStore`] - Named, append-only logs ([`FsLogStore`], [`MemoryLogStore`])
//! - [`Channel`] - Idle / Recording / Playing state machine for one joystick
//! - [`TickCoordinator`] - Advances every channel once per fixed-rate tick
//! - [`LiveInput`] - Source of live input when a channel is not playing
//! - [`SessionManager`] - Entry point for starting and stopping sessions

pub mod channel;
pub mod codec;
pub mod config;
pub mod coordinator;
pub mod error;
#[cfg(test)]
mod integration;
pub mod live;
pub mod log_store;
pub mod session;
pub mod snapshot;
#[cfg(test)]
pub mod test_utils;

pub use channel::{Channel, ChannelEvent, ChannelId, ChannelMode};
pub use codec::SampleCodec;
pub use config::{ChannelConfig, ReplayConfig, StorageConfig, TimingConfig};
pub use coordinator::{TickCoordinator, TickReport};
pub use error::{ChannelError, DecodeError, LogError};
pub use live::{LiveInput, NeutralInput, ScriptedInput, SharedInput};
pub use log_store::{FsLogStore, LogReader, LogStore, LogWriter, MemoryLogStore};
pub use session::{SessionCommand, SessionControl, SessionManager};
pub use snapshot::{AXIS_MAX, AXIS_MIN, ChannelShape, InputSnapshot};
