//! Secondary synchronisation loop.
//!
//! The strip has no way to learn about primary changes made outside the
//! controller (an app, a scene, another automation), so while the light is
//! on the dimmer is polled and its brightness mirrored onto the strip.

use tracing::{debug, info};

use super::{Controller, SecondaryLevel, TimerId, TimerMode};
use crate::devices::SecondaryCommand;

impl Controller {
    /// (Re)arm the poll. Does nothing while secondary integration is off.
    pub fn start_sync_loop(&self) {
        if !self.devices().secondary_enabled() {
            return;
        }
        let controller = self.clone();
        self.timers().schedule(
            TimerId::SyncLoop,
            self.config().sync.interval(),
            TimerMode::Repeating,
            move || {
                let controller = controller.clone();
                async move { controller.sync_tick().await }
            },
        );
        debug!("Sync loop started");
    }

    async fn sync_tick(&self) {
        {
            let mut state = self.lock();
            if state.sync_in_flight || state.mode.is_dimming() {
                return;
            }
            state.sync_in_flight = true;
        }

        let status = self.devices().primary_status().await;

        let last = {
            let mut state = self.lock();
            state.sync_in_flight = false;
            if state.mode.is_dimming() {
                return;
            }
            state.sync.last_secondary
        };
        let Some(status) = status else { return };

        let transitions = &self.config().manual_transitions_ms;
        if !status.output {
            self.timers().cancel(TimerId::SyncLoop);
            info!("Primary is off, sync loop stopped");
            if !last.is_off() {
                self.push_secondary(SecondaryCommand::Off {
                    transition: transitions.off(),
                })
                .await;
            }
            return;
        }

        let brightness = status.brightness.unwrap_or(100);
        if last.matches(brightness) {
            debug!(brightness, "Secondary already in sync");
            return;
        }
        debug!(brightness, previous = ?last, "Mirroring primary brightness");
        self.push_secondary(SecondaryCommand::On {
            brightness_pct: brightness,
            transition: transitions.on(),
            motion: false,
        })
        .await;
    }

    /// Send `command` to the strip and remember what was sent. No-op while
    /// secondary integration is off. A failed push forgets the cached level
    /// so the next sync tick sends it again.
    pub(super) async fn push_secondary(&self, command: SecondaryCommand) {
        if !self.devices().secondary_enabled() {
            return;
        }
        let level = match command {
            SecondaryCommand::On { brightness_pct, .. } => SecondaryLevel::Percent(brightness_pct),
            SecondaryCommand::Off { .. } => SecondaryLevel::Off,
        };
        self.lock().sync.last_secondary = level;
        if !self.devices().set_secondary(command).await {
            let mut state = self.lock();
            if state.sync.last_secondary == level {
                state.sync.last_secondary = SecondaryLevel::Unknown;
            }
        }
    }
}
