//! Millisecond clocks.
//!
//! The reconciliation code never reads wall-clock time directly; it asks a
//! `Clock` so that tests and headless runs can step time by hand.

use std::cell::Cell;
use std::time::Instant;

/// Source of the current time in milliseconds.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Monotonic clock measured from its creation.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        // Offset by one so that the first reading is never zero.
        self.start.elapsed().as_millis() as u64 + 1
    }
}

/// Hand-driven clock for tests and fixed-step simulation.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Cell::new(start_ms),
        }
    }

    pub fn advance(&self, ms: u64) {
        self.now.set(self.now.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.now.set(ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(1_000);
        clock.advance(16);
        assert_eq!(clock.now_ms(), 1_016);
        clock.set(5);
        assert_eq!(clock.now_ms(), 5);
    }

    #[test]
    fn monotonic_clock_is_nonzero() {
        let clock = MonotonicClock::new();
        assert!(clock.now_ms() >= 1);
    }
}
