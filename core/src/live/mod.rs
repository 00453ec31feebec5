//! Live input adapters
//!
//! A [`LiveInput`] is the fallback source a channel reads whenever it is not
//! playing a recording. Sampling never fails: a disconnected source yields a
//! neutral snapshot so the control loop always has a value to act on.

#[cfg(feature = "gamepad")]
mod gamepad;

#[cfg(feature = "gamepad")]
pub use gamepad::{GAMEPAD_AXES, GAMEPAD_BUTTONS, GamepadHub};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::snapshot::InputSnapshot;

/// Read-only capability over the true input source.
///
/// The returned snapshot is conformed to the channel shape by the caller, so
/// an empty snapshot is a valid way to report "disconnected".
pub trait LiveInput: Send {
    fn sample(&mut self) -> InputSnapshot;
}

/// Source that is never connected
#[derive(Debug, Clone, Copy, Default)]
pub struct NeutralInput;

impl LiveInput for NeutralInput {
    fn sample(&mut self) -> InputSnapshot {
        InputSnapshot::default()
    }
}

/// Input slot written by the host (or a device poller) and read by a channel.
///
/// Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct SharedInput {
    state: Arc<Mutex<Option<InputSnapshot>>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the latest device state
    pub fn set(&self, snapshot: InputSnapshot) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
    }

    /// Mark the device as disconnected
    pub fn disconnect(&self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_connected(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl LiveInput for SharedInput {
    fn sample(&mut self) -> InputSnapshot {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }
}

/// Plays a fixed list of snapshots, one per sample, then reads as disconnected
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    pending: VecDeque<InputSnapshot>,
    sampled: u64,
}

impl ScriptedInput {
    pub fn new(snapshots: impl IntoIterator<Item = InputSnapshot>) -> Self {
        Self {
            pending: snapshots.into_iter().collect(),
            sampled: 0,
        }
    }

    /// Number of samples taken so far
    pub fn sampled(&self) -> u64 {
        self.sampled
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

impl LiveInput for ScriptedInput {
    fn sample(&mut self) -> InputSnapshot {
        self.sampled += 1;
        self.pending.pop_front().unwrap_or_default()
    }
}
