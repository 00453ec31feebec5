//! Gamepad polling via gilrs
//!
//! The hub owns the gilrs context and publishes each assigned gamepad's state
//! into a [`SharedInput`] slot. Channels read those slots, so the hub stays on
//! the control thread and channels never touch the device directly.

use gilrs::{Axis, Button, GamepadId, Gilrs};
use hashbrown::HashMap;

use crate::snapshot::InputSnapshot;

use super::SharedInput;

/// Axis order of a sampled gamepad
pub const GAMEPAD_AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

/// Button order of a sampled gamepad
pub const GAMEPAD_BUTTONS: [Button; 12] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
];

pub struct GamepadHub {
    gilrs: Gilrs,
    slots: Vec<SharedInput>,
    assigned: HashMap<GamepadId, usize>,
    deadzone: f32,
}

impl GamepadHub {
    /// Create a hub with `slot_count` input slots.
    ///
    /// Returns `None` if gamepad support cannot be initialised; callers should
    /// fall back to neutral input.
    pub fn new(slot_count: usize, deadzone: f32) -> Option<Self> {
        let gilrs = match Gilrs::new() {
            Ok(g) => g,
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize gamepad support: {}. Gamepads will not be available.",
                    e
                );
                return None;
            }
        };

        let mut hub = Self {
            gilrs,
            slots: (0..slot_count).map(|_| SharedInput::new()).collect(),
            assigned: HashMap::new(),
            deadzone: deadzone.clamp(0.0, 0.99),
        };

        let connected: Vec<GamepadId> = hub
            .gilrs
            .gamepads()
            .filter(|(_, gamepad)| gamepad.is_connected())
            .map(|(id, _)| id)
            .collect();
        for id in connected {
            hub.assign(id);
        }

        Some(hub)
    }

    /// Input slot for a channel
    pub fn input(&self, slot: usize) -> Option<SharedInput> {
        self.slots.get(slot).cloned()
    }

    /// Drain device events and publish every assigned gamepad's state.
    ///
    /// Call once per tick, before advancing the channels.
    pub fn poll(&mut self) {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                gilrs::EventType::Connected => self.assign(event.id),
                gilrs::EventType::Disconnected => {
                    if let Some(slot) = self.assigned.remove(&event.id) {
                        tracing::info!("Gamepad {} (slot {}) disconnected", event.id, slot);
                        self.slots[slot].disconnect();
                    }
                }
                _ => {}
            }
        }

        for (&id, &slot) in &self.assigned {
            let gamepad = self.gilrs.gamepad(id);
            let axes = GAMEPAD_AXES.iter().map(|&axis| {
                let value = apply_deadzone(gamepad.value(axis), self.deadzone);
                // Up is positive on the sticks
                match axis {
                    Axis::LeftStickY | Axis::RightStickY => -value,
                    _ => value,
                }
            });
            let buttons = GAMEPAD_BUTTONS.iter().map(|&b| gamepad.is_pressed(b));
            self.slots[slot].set(InputSnapshot::new(axes, buttons));
        }
    }

    fn assign(&mut self, id: GamepadId) {
        if self.assigned.contains_key(&id) {
            return;
        }
        let free = (0..self.slots.len()).find(|slot| !self.assigned.values().any(|s| s == slot));
        match free {
            Some(slot) => {
                self.assigned.insert(id, slot);
                tracing::info!("Gamepad {} connected as slot {}", id, slot);
            }
            None => tracing::warn!("Gamepad {} connected but no free input slots", id),
        }
    }
}

/// Zero small deflections and rescale the rest to the full range
fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if value.abs() < deadzone {
        0.0
    } else {
        let magnitude = (value.abs() - deadzone) / (1.0 - deadzone);
        value.signum() * magnitude.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadzone() {
        assert_eq!(apply_deadzone(0.05, 0.1), 0.0);
        assert_eq!(apply_deadzone(-0.05, 0.1), 0.0);
        assert_eq!(apply_deadzone(1.0, 0.1), 1.0);
        assert_eq!(apply_deadzone(-1.0, 0.1), -1.0);
        assert!((apply_deadzone(0.55, 0.1) - 0.5).abs() < 1e-6);
    }
}
