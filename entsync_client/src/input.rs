//! Input handling.
//!
//! Each entity keeps the control state of the current and the previous pulse.
//! Gameplay triggers such as the enter/exit vehicle key fire on edges between
//! the two, never on the held state.

use entsync_shared::control::{Buttons, ControlState};

/// Current and previous control snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStateTracker {
    previous: ControlState,
    current: ControlState,
}

impl ControlStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shifts current into previous and stores `state` as current.
    pub fn push(&mut self, state: ControlState) {
        self.previous = self.current;
        self.current = state;
    }

    /// Forgets both snapshots.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn current(&self) -> ControlState {
        self.current
    }

    pub fn previous(&self) -> ControlState {
        self.previous
    }

    /// Up in the previous pulse, down now.
    pub fn just_pressed(&self, button: Buttons) -> bool {
        self.current.is_pressed(button) && !self.previous.is_pressed(button)
    }

    /// Down in the previous pulse, up now.
    pub fn just_released(&self, button: Buttons) -> bool {
        self.previous.is_pressed(button) && !self.current.is_pressed(button)
    }

    pub fn is_held(&self, button: Buttons) -> bool {
        self.current.is_pressed(button)
    }
}
