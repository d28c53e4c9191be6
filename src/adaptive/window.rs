use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Sliding window of recent motion triggers.
///
/// Every push drops entries older than `window` relative to the new entry,
/// so the stored count is what the scene engine escalates on.
#[derive(Debug, Clone)]
pub struct TriggerWindow {
    window: Duration,
    stamps: VecDeque<Instant>,
}

impl TriggerWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            stamps: VecDeque::new(),
        }
    }

    /// Record a trigger at `at` and return the pruned count.
    pub fn push(&mut self, at: Instant) -> usize {
        self.stamps.push_back(at);
        if let Some(cutoff) = at.checked_sub(self.window) {
            self.stamps.retain(|t| *t >= cutoff);
        }
        self.stamps.len()
    }

    /// Triggers currently stored, without pruning.
    pub fn count(&self) -> usize {
        self.stamps.len()
    }
}
