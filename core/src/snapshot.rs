//! Per-tick input snapshots and the channel shapes that bound them

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Inline storage for axis values (covers a standard two-stick gamepad)
pub type AxisVec = SmallVec<[f32; 8]>;

/// Inline storage for button states
pub type ButtonVec = SmallVec<[bool; 16]>;

/// Axis values are bounded to this range
pub const AXIS_MIN: f32 = -1.0;
pub const AXIS_MAX: f32 = 1.0;

/// Fixed axis/button counts of a channel.
///
/// Every snapshot recorded or played back on a channel has exactly this shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelShape {
    pub axes: u8,
    pub buttons: u8,
}

impl ChannelShape {
    pub const fn new(axes: u8, buttons: u8) -> Self {
        Self { axes, buttons }
    }

    pub fn axis_count(&self) -> usize {
        self.axes as usize
    }

    pub fn button_count(&self) -> usize {
        self.buttons as usize
    }

    /// Bytes used by the packed button bitfield
    pub fn button_bytes(&self) -> usize {
        self.button_count().div_ceil(8)
    }

    /// Encoded size of one record in bytes
    pub fn record_size(&self) -> usize {
        self.axis_count() * 4 + self.button_bytes()
    }
}

impl Default for ChannelShape {
    /// Two sticks plus triggers, twelve buttons
    fn default() -> Self {
        Self::new(6, 12)
    }
}

impl fmt::Display for ChannelShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} axes / {} buttons", self.axes, self.buttons)
    }
}

/// One tick's sampled input state.
///
/// The tick index is implicit: it is the snapshot's position in its log.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub axes: AxisVec,
    pub buttons: ButtonVec,
}

impl InputSnapshot {
    pub fn new(
        axes: impl IntoIterator<Item = f32>,
        buttons: impl IntoIterator<Item = bool>,
    ) -> Self {
        Self {
            axes: axes.into_iter().collect(),
            buttons: buttons.into_iter().collect(),
        }
    }

    /// All axes zero, all buttons released
    pub fn neutral(shape: ChannelShape) -> Self {
        Self {
            axes: SmallVec::from_elem(0.0, shape.axis_count()),
            buttons: SmallVec::from_elem(false, shape.button_count()),
        }
    }

    pub fn axis(&self, index: usize) -> Option<f32> {
        self.axes.get(index).copied()
    }

    pub fn button(&self, index: usize) -> Option<bool> {
        self.buttons.get(index).copied()
    }

    /// True if the snapshot has exactly `shape`'s axis and button counts
    pub fn matches(&self, shape: ChannelShape) -> bool {
        self.axes.len() == shape.axis_count() && self.buttons.len() == shape.button_count()
    }

    /// Force the snapshot into `shape`.
    ///
    /// Missing entries are filled with neutral values, extra entries are dropped,
    /// axes are clamped to [-1.0, 1.0] and NaN becomes 0.0.
    pub fn conform(mut self, shape: ChannelShape) -> Self {
        self.axes.resize(shape.axis_count(), 0.0);
        self.buttons.resize(shape.button_count(), false);
        for value in &mut self.axes {
            *value = if value.is_nan() {
                0.0
            } else {
                value.clamp(AXIS_MIN, AXIS_MAX)
            };
        }
        self
    }
}
