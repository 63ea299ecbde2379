//! Control state snapshots.
//!
//! A `ControlState` is what a player's pad reported for one tick. It is small
//! and `Copy` so entities can keep the previous and current snapshot side by
//! side for edge detection.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Digital controls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u32 {
        const ENTER_EXIT_VEHICLE = 1 << 0;
        const HORN = 1 << 1;
        const SPRINT = 1 << 2;
        const JUMP = 1 << 3;
        const CROUCH = 1 << 4;
        const FIRE = 1 << 5;
        const AIM = 1 << 6;
        const ACCELERATE = 1 << 7;
        const BRAKE = 1 << 8;
        const HANDBRAKE = 1 << 9;
        const MELEE = 1 << 10;
        const RELOAD = 1 << 11;
    }
}

/// One tick of pad input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlState {
    pub buttons: Buttons,
    /// Left stick, -128..=127 per axis.
    pub move_x: i8,
    pub move_y: i8,
    /// Right stick.
    pub look_x: i8,
    pub look_y: i8,
}

impl ControlState {
    pub fn with_buttons(buttons: Buttons) -> Self {
        Self {
            buttons,
            ..Self::default()
        }
    }

    pub fn is_pressed(&self, button: Buttons) -> bool {
        self.buttons.contains(button)
    }

    pub fn is_using_enter_exit_vehicle(&self) -> bool {
        self.is_pressed(Buttons::ENTER_EXIT_VEHICLE)
    }

    pub fn is_using_horn(&self) -> bool {
        self.is_pressed(Buttons::HORN)
    }

    pub fn is_sprinting(&self) -> bool {
        self.is_pressed(Buttons::SPRINT)
    }

    pub fn is_firing(&self) -> bool {
        self.is_pressed(Buttons::FIRE)
    }

    pub fn is_aiming(&self) -> bool {
        self.is_pressed(Buttons::AIM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_idle() {
        let state = ControlState::default();
        assert!(state.buttons.is_empty());
        assert!(!state.is_using_enter_exit_vehicle());
    }

    #[test]
    fn buttons_combine() {
        let state = ControlState::with_buttons(Buttons::HORN | Buttons::SPRINT);
        assert!(state.is_using_horn());
        assert!(state.is_sprinting());
        assert!(!state.is_firing());
    }
}
