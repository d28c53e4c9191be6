//! Device Adapters
//!
//! One trait per outbound collaborator, each returning `Result<_, DeviceError>`:
//! - [`PrimaryLight`]: the dimmer (set / get status)
//! - [`SecondaryLight`]: the WLED strip
//! - [`PowerSwitch`]: the strip's upstream power supply
//! - [`MotionFlagStore`]: the persisted "motion response enabled" flag
//! - [`SensorPoller`]: one-off sensor status poll at start-up
//!
//! The controller never sees those results. It talks to [`Devices`], which
//! logs every failure and carries on with a neutral value; the next sync tick
//! or event reconciles whatever was lost.

pub mod flag_store;
pub mod sensors;
pub mod shelly;
pub mod wled;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{FlagBackend, LightingConfig};
use crate::types::PrimaryStatus;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("flag storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for DeviceError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

// ============================================================================
// Commands
// ============================================================================

/// A primary light set request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightCommand {
    pub on: bool,
    pub brightness: Option<u8>,
    pub transition: Option<Duration>,
    /// Dimmer flips the output back after this long
    pub toggle_after: Option<Duration>,
}

impl LightCommand {
    pub const fn on(brightness: u8, transition: Duration) -> Self {
        Self {
            on: true,
            brightness: Some(brightness),
            transition: Some(transition),
            toggle_after: None,
        }
    }

    pub const fn off(transition: Duration) -> Self {
        Self {
            on: false,
            brightness: None,
            transition: Some(transition),
            toggle_after: None,
        }
    }
}

/// A secondary (strip) state request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryCommand {
    On {
        brightness_pct: u8,
        transition: Duration,
        /// Motion scenes may select an effect; everything else is a static color
        motion: bool,
    },
    Off {
        transition: Duration,
    },
}

// ============================================================================
// Traits
// ============================================================================

#[async_trait]
pub trait PrimaryLight: Send + Sync {
    async fn set(&self, command: LightCommand) -> Result<(), DeviceError>;
    async fn status(&self) -> Result<PrimaryStatus, DeviceError>;
}

#[async_trait]
pub trait SecondaryLight: Send + Sync {
    async fn apply(&self, command: SecondaryCommand) -> Result<(), DeviceError>;
}

#[async_trait]
pub trait PowerSwitch: Send + Sync {
    async fn turn_on(&self, toggle_after: Option<Duration>) -> Result<(), DeviceError>;
}

#[async_trait]
pub trait MotionFlagStore: Send + Sync {
    /// `Ok(None)` when the flag is absent or unreadable as a boolean.
    async fn get(&self) -> Result<Option<bool>, DeviceError>;
    async fn set(&self, enabled: bool) -> Result<(), DeviceError>;
}

#[async_trait]
pub trait SensorPoller: Send + Sync {
    /// Whether the sensor behind `status_url` currently reports motion.
    async fn motion(&self, status_url: &str) -> Result<bool, DeviceError>;
}

// ============================================================================
// Facade
// ============================================================================

/// The controller's view of its devices: every call succeeds from its point
/// of view, failures end up in the log.
#[derive(Clone)]
pub struct Devices {
    primary: Arc<dyn PrimaryLight>,
    secondary: Arc<dyn SecondaryLight>,
    power: Arc<dyn PowerSwitch>,
    flag: Arc<dyn MotionFlagStore>,
    sensors: Arc<dyn SensorPoller>,
    secondary_enabled: bool,
}

impl std::fmt::Debug for Devices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Devices")
            .field("secondary_enabled", &self.secondary_enabled)
            .finish_non_exhaustive()
    }
}

impl Devices {
    pub fn new(
        primary: Arc<dyn PrimaryLight>,
        secondary: Arc<dyn SecondaryLight>,
        power: Arc<dyn PowerSwitch>,
        flag: Arc<dyn MotionFlagStore>,
        sensors: Arc<dyn SensorPoller>,
        secondary_enabled: bool,
    ) -> Self {
        Self {
            primary,
            secondary,
            power,
            flag,
            sensors,
            secondary_enabled,
        }
    }

    /// Build the network adapters described by `config`.
    pub fn from_config(config: &LightingConfig, client: &reqwest::Client) -> Result<Self, DeviceError> {
        let dimmer_rpc = shelly::ShellyRpc::new(client.clone(), &config.primary.host);
        let primary = Arc::new(shelly::ShellyDimmer::new(dimmer_rpc.clone(), config.primary.light_id));

        let flag: Arc<dyn MotionFlagStore> = match config.motion_flag.backend {
            FlagBackend::Shelly => Arc::new(shelly::ShellyFlag::new(dimmer_rpc, config.motion_flag.vbool_id)),
            FlagBackend::Local => Arc::new(flag_store::SledFlagStore::open(&config.motion_flag.path)?),
        };

        let power = Arc::new(shelly::ShellySwitch::new(
            shelly::ShellyRpc::new(client.clone(), &config.secondary.psu_host),
            config.secondary.psu_switch_id,
        ));
        let secondary = Arc::new(wled::WledClient::new(client.clone(), &config.secondary));
        let sensors = Arc::new(sensors::HttpSensorPoller::new(
            client.clone(),
            config.http.sensor_poll_timeout(),
        ));

        Ok(Self::new(primary, secondary, power, flag, sensors, config.secondary.enabled))
    }

    pub const fn secondary_enabled(&self) -> bool {
        self.secondary_enabled
    }

    pub async fn set_primary(&self, command: LightCommand) {
        if let Err(e) = self.primary.set(command).await {
            warn!(device = "primary", error = %e, "Light.Set failed");
        }
    }

    pub async fn primary_status(&self) -> Option<PrimaryStatus> {
        match self.primary.status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(device = "primary", error = %e, "Light.GetStatus failed");
                None
            }
        }
    }

    /// No-op while secondary integration is disabled. Returns false only
    /// when the strip rejected or never received the command.
    pub async fn set_secondary(&self, command: SecondaryCommand) -> bool {
        if !self.secondary_enabled {
            return true;
        }
        match self.secondary.apply(command).await {
            Ok(()) => true,
            Err(e) => {
                warn!(device = "secondary", error = %e, "WLED state update failed");
                false
            }
        }
    }

    /// Power the strip. No-op while secondary integration is disabled.
    pub async fn power_on(&self, toggle_after: Option<Duration>) {
        if !self.secondary_enabled {
            return;
        }
        if let Err(e) = self.power.turn_on(toggle_after).await {
            warn!(device = "psu", error = %e, "Switch.Set failed");
        }
    }

    /// Read the motion flag. Anything but a stored boolean counts as enabled
    /// and is written back as such.
    pub async fn motion_enabled(&self) -> bool {
        match self.flag.get().await {
            Ok(Some(enabled)) => enabled,
            Ok(None) => {
                warn!("Motion flag missing or malformed, re-initialising to enabled");
                self.set_motion_enabled(true).await;
                true
            }
            Err(e) => {
                warn!(error = %e, "Motion flag read failed, treating as enabled");
                self.set_motion_enabled(true).await;
                true
            }
        }
    }

    pub async fn set_motion_enabled(&self, enabled: bool) {
        if let Err(e) = self.flag.set(enabled).await {
            warn!(device = "motion_flag", error = %e, enabled, "Motion flag write failed");
        }
    }

    /// Start-up poll. Any failure reads as "no motion".
    pub async fn sensor_motion(&self, sensor_id: &str, status_url: &str) -> bool {
        match self.sensors.motion(status_url).await {
            Ok(motion) => {
                debug!(sensor = sensor_id, motion, "Initial sensor poll");
                motion
            }
            Err(e) => {
                warn!(sensor = sensor_id, error = %e, "Initial sensor poll failed");
                false
            }
        }
    }
}
