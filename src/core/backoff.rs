//! Purpose: Adaptive delay between poll ticks.
//! Exports: `Backoff`, `MIN_DELAY`, `MAX_DELAY`.
//! Role: Shared by the existence and finalization phases.
//! Invariants: Delay never drops below the floor or exceeds the cap.
//! Invariants: `grow` doubles; `reset` returns to the floor.

use std::time::Duration;

/// 1/1024 s, rounded to the nearest nanosecond.
pub const MIN_DELAY: Duration = Duration::from_nanos(976_563);
pub const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Backoff {
    floor: Duration,
    cap: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(floor: Duration, cap: Duration) -> Self {
        let cap = cap.max(floor);
        Self {
            floor,
            cap,
            current: floor,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn reset(&mut self) {
        self.current = self.floor;
    }

    pub fn grow(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.cap);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(MIN_DELAY, MAX_DELAY)
    }
}
