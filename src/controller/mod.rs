//! Arbitration controller
//!
//! Decides what the corridor light and strip should do in response to
//! motion, wall-button gestures and status changes of the primary light.
//!
//! ## Task model
//!
//! Events are handled one at a time in arrival order by the event loop
//! (see [`event_loop`]). Each handler runs its synchronous prefix (every
//! state read and write before the first device call) inline, then spawns
//! the rest as a task. After each device call that task re-locks the state
//! and re-checks mode and sensors, because other events may have been
//! handled meanwhile. The state mutex is never held across an `.await`.

mod arbitration;
pub mod event_loop;
pub mod state;
mod sync_loop;
pub mod timers;

pub use event_loop::{event_channel, run_event_loop, EventSender};
pub use state::{ControlMode, ControllerState, Phase, SecondaryLevel, SensorRegistry, SyncCache};
pub use timers::{TimerId, TimerMode, TimerRegistry};

use futures::future::join_all;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

use crate::adaptive::{self, PeriodKind, Scene, TriggerWindow};
use crate::clock::Clock;
use crate::config::defaults::SELF_DRIVEN_GUARD;
use crate::config::LightingConfig;
use crate::devices::{Devices, LightCommand};
use crate::types::ControlEvent;

struct Shared {
    config: Arc<LightingConfig>,
    devices: Devices,
    clock: Arc<dyn Clock>,
    timers: TimerRegistry,
    state: Mutex<ControllerState>,
}

/// Cloneable handle to the one controller instance.
#[derive(Clone)]
pub struct Controller {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("devices", &self.shared.devices)
            .field("timers", &self.shared.timers)
            .finish_non_exhaustive()
    }
}

/// Read-only view served by `GET /api/v1/state`.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub phase: Phase,
    pub mode: ControlMode,
    pub active_sensors: Vec<String>,
    pub trigger_count: usize,
    pub sync: SyncCache,
    pub self_driven: bool,
    pub pending_timers: Vec<TimerId>,
}

/// What a motion event would produce right now.
#[derive(Debug, Clone, Serialize)]
pub struct ScenePreview {
    pub local_hour: u32,
    pub period: PeriodKind,
    pub trigger_count: usize,
    pub scene: Scene,
}

impl Controller {
    pub fn new(config: Arc<LightingConfig>, devices: Devices, clock: Arc<dyn Clock>) -> Self {
        let sensors = SensorRegistry::new(config.sensors.iter().map(|s| s.id.clone()));
        let window = TriggerWindow::new(config.adaptive.window());
        Self {
            shared: Arc::new(Shared {
                config,
                devices,
                clock,
                timers: TimerRegistry::new(),
                state: Mutex::new(ControllerState::new(sensors, window)),
            }),
        }
    }

    pub fn config(&self) -> &LightingConfig {
        &self.shared.config
    }

    fn devices(&self) -> &Devices {
        &self.shared.devices
    }

    fn timers(&self) -> &TimerRegistry {
        &self.shared.timers
    }

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.shared.state.lock().unwrap_or_else(|poisoned| {
            warn!("Controller state lock poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether `id` names a configured sensor.
    pub fn knows_sensor(&self, id: &str) -> bool {
        self.lock().sensors.contains(id)
    }

    /// Run the synchronous part of the handler for `event`; the remainder
    /// continues on a spawned task. Must be called from within a tokio
    /// runtime.
    pub fn dispatch(&self, event: ControlEvent) {
        match event {
            ControlEvent::MotionStart(id) => self.on_motion_start(&id),
            ControlEvent::MotionEnd(id) => self.on_motion_end(&id),
            ControlEvent::Button(gesture) => self.on_button(gesture),
            ControlEvent::Status(delta) => self.on_status(delta),
        }
    }

    /// Local hour after the configured offset.
    pub fn local_hour(&self) -> u32 {
        adaptive::local_hour(
            self.shared.clock.hour(),
            self.config().location.timezone_offset_hours,
        )
    }

    /// Evaluate the scene engine for the current window without touching it.
    pub fn preview_scene(&self) -> ScenePreview {
        let trigger_count = self.lock().window.count();
        let local_hour = self.local_hour();
        let adaptive = &self.config().adaptive;
        ScenePreview {
            local_hour,
            period: adaptive::resolve_period(adaptive, local_hour).0,
            trigger_count,
            scene: adaptive::compute_scene(adaptive, trigger_count, local_hour),
        }
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let pending_timers = self.timers().pending();
        let state = self.lock();
        StateSnapshot {
            phase: state.phase(),
            mode: state.mode,
            active_sensors: state.sensors.active_ids(),
            trigger_count: state.window.count(),
            sync: state.sync,
            self_driven: state.self_driven,
            pending_timers,
        }
    }

    /// Command the primary light, ignoring the status echo it causes until
    /// a short grace period after the command completes.
    async fn set_primary(&self, command: LightCommand) {
        self.lock().self_driven = true;
        self.timers().cancel(TimerId::SelfDrivenGuard);

        self.devices().set_primary(command).await;

        let controller = self.clone();
        self.timers().schedule(
            TimerId::SelfDrivenGuard,
            SELF_DRIVEN_GUARD,
            TimerMode::Once,
            move || {
                let controller = controller.clone();
                async move {
                    controller.lock().self_driven = false;
                }
            },
        );
    }

    /// Start-up reconciliation: log the motion flag, replay motion already
    /// in progress, and resume synchronisation if the light is on.
    ///
    /// Sensors reporting motion are queued on `events` as motion starts, so
    /// the event loop must already be draining it.
    pub async fn bootstrap(&self, events: &EventSender) {
        let enabled = self.devices().motion_enabled().await;
        info!(
            backend = ?self.config().motion_flag.backend,
            "Motion response flag: {}",
            if enabled { "ENABLED" } else { "DISABLED" }
        );

        let polls = self.config().sensors.iter().filter_map(|sensor| {
            let url = sensor.status_url.as_deref()?;
            let devices = self.devices().clone();
            Some(async move { (sensor.id.clone(), devices.sensor_motion(&sensor.id, url).await) })
        });

        for (id, motion) in join_all(polls).await {
            info!(sensor = %id, motion, "Initial sensor poll");
            if motion {
                events.send(ControlEvent::MotionStart(id)).await;
            }
        }

        if let Some(status) = self.devices().primary_status().await {
            if status.output {
                info!("Primary light is on at start-up, starting sync loop");
                self.start_sync_loop();
            }
        }
    }

    /// Cancel every pending timer. In-flight device calls run to completion.
    pub fn shutdown(&self) {
        self.timers().cancel_all();
    }
}
