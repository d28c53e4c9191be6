//! Event handlers: motion, wall-button gestures and primary status changes.

use tokio::time::Instant;
use tracing::{debug, info};

use super::{Controller, TimerId, TimerMode};
use crate::adaptive;
use crate::config::defaults::{DIMMING_SETTLE, MOTION_END_DEBOUNCE};
use crate::devices::{LightCommand, SecondaryCommand};
use crate::types::{ButtonGesture, StatusDelta};

fn min_sec(secs: u64) -> String {
    format!("{}m {}s", secs / 60, secs % 60)
}

impl Controller {
    // ========================================================================
    // Motion
    // ========================================================================

    pub(super) fn on_motion_start(&self, sensor_id: &str) {
        self.timers().cancel(TimerId::EndHold);
        if !self.lock().sensors.set(sensor_id, true) {
            debug!(sensor = sensor_id, "Motion from unknown sensor dropped");
            return;
        }

        let controller = self.clone();
        let sensor_id = sensor_id.to_string();
        tokio::spawn(async move { controller.apply_motion_scene(&sensor_id).await });
    }

    async fn apply_motion_scene(&self, sensor_id: &str) {
        let enabled = self.devices().motion_enabled().await;
        let local_hour = self.local_hour();

        let (count, scene, epoch) = {
            let mut state = self.lock();
            if !enabled || state.mode.is_manual_hold() {
                info!(sensor = sensor_id, enabled, mode = ?state.mode, "Motion ignored (disabled/manual)");
                return;
            }
            let count = state.window.push(Instant::now());
            let scene = adaptive::compute_scene(&self.config().adaptive, count, local_hour);
            state.sync.last_motion_brightness = Some(scene.primary_brightness);
            state.auto_lit = true;
            (count, scene, state.off_epoch)
        };

        info!(
            sensor = sensor_id,
            triggers = count,
            "Motion | primary {}% | secondary {}%",
            scene.primary_brightness,
            scene.secondary_brightness
        );

        let timers = &self.config().timers;
        self.devices().power_on(None).await;
        tokio::time::sleep(timers.psu_stabilization()).await;

        {
            let mut state = self.lock();
            if state.mode.is_manual_hold() || state.off_epoch != epoch {
                info!(sensor = sensor_id, mode = ?state.mode, "Light taken over while powering up, motion scene dropped");
                state.auto_lit = false;
                return;
            }
        }

        self.set_primary(LightCommand::on(
            scene.primary_brightness,
            std::time::Duration::from_millis(scene.primary_transition_ms),
        ))
        .await;
        self.push_secondary(SecondaryCommand::On {
            brightness_pct: scene.secondary_brightness,
            transition: std::time::Duration::from_millis(scene.secondary_transition_ms),
            motion: true,
        })
        .await;
        self.start_sync_loop();
    }

    pub(super) fn on_motion_end(&self, sensor_id: &str) {
        if !self.lock().sensors.set(sensor_id, false) {
            debug!(sensor = sensor_id, "Motion end from unknown sensor dropped");
            return;
        }
        info!(sensor = sensor_id, "Motion end");

        let controller = self.clone();
        tokio::spawn(async move { controller.arm_end_hold().await });
    }

    async fn arm_end_hold(&self) {
        tokio::time::sleep(MOTION_END_DEBOUNCE).await;
        if self.lock().sensors.any_active() {
            info!("Holding, other sensors still active");
            return;
        }

        match self.devices().primary_status().await {
            Some(status) if status.output => {}
            _ => return,
        }
        let enabled = self.devices().motion_enabled().await;

        {
            let state = self.lock();
            if !enabled || state.mode.is_manual_hold() {
                debug!(enabled, mode = ?state.mode, "End-hold not armed");
                return;
            }
            if state.sensors.any_active() {
                info!("Motion resumed while checking, end-hold not armed");
                return;
            }
        }

        let hold = self.config().timers.end_hold_s;
        info!("All sensors clear, end-hold armed for {}", min_sec(hold));

        let controller = self.clone();
        self.timers().schedule(
            TimerId::EndHold,
            self.config().timers.end_hold(),
            TimerMode::Once,
            move || {
                let controller = controller.clone();
                async move {
                    info!("End-hold expired, turning light off");
                    controller.lock().auto_lit = false;
                    let off = controller.config().manual_transitions_ms.off();
                    controller.set_primary(LightCommand::off(off)).await;
                }
            },
        );
    }

    // ========================================================================
    // Wall Button
    // ========================================================================

    pub(super) fn on_button(&self, gesture: ButtonGesture) {
        match gesture {
            ButtonGesture::Double => self.start_manual_hold(),
            ButtonGesture::LongPressStart => {
                {
                    let mut state = self.lock();
                    state.mode = state.mode.start_dimming();
                }
                self.timers().cancel(TimerId::SyncLoop);
                info!("Long press, sync loop paused");
            }
            ButtonGesture::LongPressEnd => {
                {
                    let mut state = self.lock();
                    if !state.mode.is_dimming() {
                        debug!("Button release without long press ignored");
                        return;
                    }
                    state.mode = state.mode.end_dimming();
                }
                info!("Long press ended, finalising sync");

                let controller = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(DIMMING_SETTLE).await;
                    if controller.lock().mode.is_dimming() {
                        return;
                    }
                    controller.start_sync_loop();
                });
            }
        }
    }

    fn start_manual_hold(&self) {
        self.timers().cancel(TimerId::EndHold);
        {
            let mut state = self.lock();
            state.mode = state.mode.with_hold();
        }
        info!(
            "Double press, manual hold active for {}",
            min_sec(self.config().timers.manual_hold_s)
        );

        let controller = self.clone();
        tokio::spawn(async move { controller.devices().set_motion_enabled(false).await });

        let controller = self.clone();
        self.timers().schedule(
            TimerId::ManualHold,
            self.config().timers.manual_hold(),
            TimerMode::Once,
            move || {
                let controller = controller.clone();
                async move { controller.expire_manual_hold().await }
            },
        );
    }

    async fn expire_manual_hold(&self) {
        info!("Manual hold expired");
        {
            let mut state = self.lock();
            state.mode = state.mode.without_hold();
        }
        self.devices().set_motion_enabled(true).await;

        if let Some(status) = self.devices().primary_status().await {
            if status.output {
                self.lock().auto_lit = false;
                let off = self.config().manual_transitions_ms.off();
                self.set_primary(LightCommand::off(off)).await;
            }
        }
    }

    // ========================================================================
    // Primary Status
    // ========================================================================

    pub(super) fn on_status(&self, delta: StatusDelta) {
        if self.lock().self_driven {
            debug!(output = delta.output, source = %delta.source, "Status echo of own command ignored");
            return;
        }

        if delta.output {
            self.on_turned_on(&delta);
        } else {
            self.on_turned_off(&delta);
        }
    }

    fn on_turned_on(&self, delta: &StatusDelta) {
        let brightness = delta.brightness.unwrap_or(0);
        info!(source = %delta.source, brightness, "Light is ON, syncing secondary");

        let mut reenable = false;
        if delta.is_manual() {
            self.timers().cancel(TimerId::EndHold);
            reenable = !self.lock().mode.is_manual_hold();
        }
        let epoch = self.lock().off_epoch;

        let controller = self.clone();
        tokio::spawn(async move {
            if reenable {
                controller.devices().set_motion_enabled(true).await;
            }
            controller.devices().power_on(None).await;
            tokio::time::sleep(controller.config().timers.psu_stabilization()).await;
            if controller.lock().off_epoch != epoch {
                debug!("Light switched off again before the strip caught up");
                return;
            }
            controller
                .push_secondary(SecondaryCommand::On {
                    brightness_pct: brightness,
                    transition: controller.config().manual_transitions_ms.on(),
                    motion: false,
                })
                .await;
            controller.start_sync_loop();
        });
    }

    fn on_turned_off(&self, delta: &StatusDelta) {
        info!(source = %delta.source, "Light is OFF, resetting");
        self.timers().cancel(TimerId::EndHold);
        self.timers().cancel(TimerId::ManualHold);
        {
            let mut state = self.lock();
            state.mode = state.mode.without_hold();
            state.auto_lit = false;
            state.off_epoch += 1;
        }

        let controller = self.clone();
        tokio::spawn(async move {
            let config = controller.config();
            controller.devices().set_motion_enabled(true).await;
            controller
                .push_secondary(SecondaryCommand::Off {
                    transition: config.manual_transitions_ms.off(),
                })
                .await;
            controller
                .devices()
                .power_on(Some(config.timers.psu_keepalive()))
                .await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::min_sec;

    #[test]
    fn test_min_sec() {
        assert_eq!(min_sec(12), "0m 12s");
        assert_eq!(min_sec(1_800), "30m 0s");
        assert_eq!(min_sec(605), "10m 5s");
    }
}
