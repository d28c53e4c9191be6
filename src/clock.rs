//! Wall-clock hour source for the scene engine.

use chrono::Timelike;
use std::sync::atomic::{AtomicU32, Ordering};

/// Supplies the host's current hour of day (0-23).
pub trait Clock: Send + Sync {
    fn hour(&self) -> u32;
}

/// Reads the host's local time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn hour(&self) -> u32 {
        chrono::Local::now().hour()
    }
}

/// A clock pinned to a settable hour.
#[derive(Debug, Default)]
pub struct FixedClock {
    hour: AtomicU32,
}

impl FixedClock {
    pub fn new(hour: u32) -> Self {
        Self {
            hour: AtomicU32::new(hour % 24),
        }
    }

    pub fn set_hour(&self, hour: u32) {
        self.hour.store(hour % 24, Ordering::Relaxed);
    }
}

impl Clock for FixedClock {
    fn hour(&self) -> u32 {
        self.hour.load(Ordering::Relaxed)
    }
}
