//! Interpolation.
//!
//! The host sends discrete positions for remote players. Instead of placing
//! the ped there, the difference between where it is and where it should be
//! is spread over a short window, a slice per pulse. Whatever the local
//! physics does to the ped in the meantime is kept; only the error is fed in.

use entsync_shared::math::{clamp01, unlerp_ms, Vec3};

/// Error-compensation state for one entity.
#[derive(Debug, Clone, Default)]
pub struct PositionInterpolation {
    armed: bool,
    start_ms: u64,
    finish_ms: u64,
    target: Vec3,
    error: Vec3,
    last_alpha: f32,
}

/// Result of one interpolation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterpStep {
    /// Move by the compensation slice to this position.
    Blend(Vec3),
    /// The gap was too large to hide; jump to the target.
    Snap(Vec3),
}

impl InterpStep {
    pub fn position(self) -> Vec3 {
        match self {
            InterpStep::Blend(p) | InterpStep::Snap(p) => p,
        }
    }
}

impl PositionInterpolation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn error(&self) -> Vec3 {
        self.error
    }

    pub fn last_alpha(&self) -> f32 {
        self.last_alpha
    }

    pub fn finish_ms(&self) -> u64 {
        self.finish_ms
    }

    /// Starts absorbing `target - current` over `delay_ms`.
    pub fn arm(&mut self, current: Vec3, target: Vec3, now_ms: u64, delay_ms: u64) {
        self.target = target;
        self.error = target - current;
        self.start_ms = now_ms;
        self.finish_ms = now_ms.saturating_add(delay_ms);
        self.last_alpha = 0.0;
        self.armed = true;
    }

    pub fn disarm(&mut self) {
        self.armed = false;
    }

    /// Advances by one pulse. `None` while disarmed.
    ///
    /// Disarms itself once the window has elapsed or when `current` is more
    /// than `snap_distance` away from the target.
    pub fn step(&mut self, current: Vec3, now_ms: u64, snap_distance: f32) -> Option<InterpStep> {
        if !self.armed {
            return None;
        }

        let alpha = clamp01(unlerp_ms(self.start_ms, now_ms, self.finish_ms));
        let delta = alpha - self.last_alpha;
        self.last_alpha = alpha;

        if alpha >= 1.0 {
            self.armed = false;
        }

        if current.distance(self.target) > snap_distance {
            self.armed = false;
            return Some(InterpStep::Snap(self.target));
        }

        Some(InterpStep::Blend(current + self.error * delta))
    }
}
