//! Attribute locks.
//!
//! Health and armour can be pinned by the host. While pinned, reads return
//! the pinned value no matter what the engine says, and every pulse writes it
//! back so local damage never sticks.

/// An attribute value that may be pinned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockableAttribute {
    locked: Option<u32>,
}

impl LockableAttribute {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&mut self, value: u32) {
        self.locked = Some(value);
    }

    pub fn unlock(&mut self) {
        self.locked = None;
    }

    pub fn is_locked(&self) -> bool {
        self.locked.is_some()
    }

    pub fn locked_value(&self) -> Option<u32> {
        self.locked
    }

    /// The value callers should see given what the engine reports.
    pub fn resolve(&self, native: u32) -> u32 {
        self.locked.unwrap_or(native)
    }

    /// Value to write back this pulse, if the engine disagrees with the lock.
    pub fn drift_correction(&self, native: u32) -> Option<u32> {
        self.locked.filter(|v| *v != native)
    }
}

/// Whether a money change is too large to animate on the HUD counter.
pub fn should_snap_display(delta: i64, threshold: i64) -> bool {
    delta < -threshold || delta > threshold
}
