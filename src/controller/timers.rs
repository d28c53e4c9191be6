//! Timer Registry
//!
//! Named, cancelable delayed callbacks. At most one timer is pending per
//! [`TimerId`]; arming a name aborts whatever was pending under it.
//!
//! One-shot timers release their slot before the callback runs, so the
//! callback may re-arm its own name. Every slot carries a generation number
//! so an old task can never release a newer arm. Repeating timers spawn each
//! tick's callback as a separate task: cancelling the timer from inside its
//! own tick stops future ticks without killing the tick in progress.

use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

/// Closed set of timer names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerId {
    /// Turns the light off after every sensor has gone quiet
    EndHold,
    /// Ends a double-press manual hold
    ManualHold,
    /// Secondary synchronisation poll
    SyncLoop,
    /// Releases the self-driven guard after our own primary command
    SelfDrivenGuard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerMode {
    Once,
    Repeating,
}

struct Slot {
    generation: u64,
    handle: AbortHandle,
}

#[derive(Clone, Default)]
pub struct TimerRegistry {
    slots: Arc<Mutex<HashMap<TimerId, Slot>>>,
    generations: Arc<AtomicU64>,
}

impl std::fmt::Debug for TimerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerRegistry")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TimerId, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| {
            warn!("Timer registry lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Arm `id` to run `callback` after `delay` (and every `delay` after that
    /// for [`TimerMode::Repeating`]). Any timer already pending under `id` is
    /// aborted first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&self, id: TimerId, delay: Duration, mode: TimerMode, callback: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generations.fetch_add(1, Ordering::Relaxed);
        let registry = self.clone();

        // Held across the spawn so a zero-delay one-shot cannot release its
        // slot before the slot exists.
        let mut slots = self.lock();
        if let Some(prev) = slots.remove(&id) {
            prev.handle.abort();
        }

        let task = tokio::spawn(async move {
            match mode {
                TimerMode::Once => {
                    tokio::time::sleep(delay).await;
                    registry.release(id, generation);
                    callback().await;
                }
                TimerMode::Repeating => {
                    let mut ticker = interval_at(Instant::now() + delay, delay);
                    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        ticker.tick().await;
                        tokio::spawn(callback());
                    }
                }
            }
        });

        debug!(timer = ?id, delay_ms = delay.as_millis(), ?mode, "Timer armed");
        slots.insert(
            id,
            Slot {
                generation,
                handle: task.abort_handle(),
            },
        );
    }

    /// Abort the timer pending under `id`. No-op when nothing is pending.
    pub fn cancel(&self, id: TimerId) {
        if let Some(slot) = self.lock().remove(&id) {
            slot.handle.abort();
            debug!(timer = ?id, "Timer cancelled");
        }
    }

    pub fn cancel_all(&self) {
        for (_, slot) in self.lock().drain() {
            slot.handle.abort();
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.lock().contains_key(&id)
    }

    /// Names with a pending timer, sorted.
    pub fn pending(&self) -> Vec<TimerId> {
        let mut ids: Vec<TimerId> = self.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    fn release(&self, id: TimerId, generation: u64) {
        let mut slots = self.lock();
        if slots.get(&id).is_some_and(|s| s.generation == generation) {
            slots.remove(&id);
        }
    }
}
