//! Lighting Configuration - every controller tunable as an operator-editable TOML value
//!
//! Each struct implements `Default` with the values the corridor controller
//! ships with, so running without a config file gives the stock behaviour.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults::{CONFIG_ENV_VAR, DEFAULT_CONFIG_FILE};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one corridor installation.
///
/// Load with `LightingConfig::load()` which searches:
/// 1. `$CORRIDOR_CONFIG` env var
/// 2. `./corridor.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LightingConfig {
    /// Local-time correction for the device clock
    #[serde(default)]
    pub location: LocationConfig,

    /// Inbound HTTP surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound HTTP behaviour
    #[serde(default)]
    pub http: HttpConfig,

    /// The dimmer driving the corridor light
    #[serde(default)]
    pub primary: PrimaryConfig,

    /// WLED strip and its upstream power switch
    #[serde(default)]
    pub secondary: SecondaryConfig,

    /// Where the "automatic motion response enabled" flag lives
    #[serde(default)]
    pub motion_flag: MotionFlagConfig,

    /// Time-of-day periods and trigger escalation
    #[serde(default)]
    pub adaptive: AdaptiveConfig,

    /// Hold, keepalive and stabilisation timings
    #[serde(default)]
    pub timers: TimerConfig,

    /// Transitions used for manual and housekeeping changes
    #[serde(default)]
    pub manual_transitions_ms: ManualTransitions,

    /// Secondary synchronisation loop
    #[serde(default)]
    pub sync: SyncConfig,

    /// Motion sensors allowed to signal the controller
    #[serde(default = "default_sensors")]
    pub sensors: Vec<SensorConfig>,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            location: LocationConfig::default(),
            server: ServerConfig::default(),
            http: HttpConfig::default(),
            primary: PrimaryConfig::default(),
            secondary: SecondaryConfig::default(),
            motion_flag: MotionFlagConfig::default(),
            adaptive: AdaptiveConfig::default(),
            timers: TimerConfig::default(),
            manual_transitions_ms: ManualTransitions::default(),
            sync: SyncConfig::default(),
            sensors: default_sensors(),
        }
    }
}

/// Where a loaded configuration came from, for the start-up log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Defaults => write!(f, "built-in defaults"),
        }
    }
}

impl LightingConfig {
    /// Load configuration using the standard search order:
    /// 1. `$CORRIDOR_CONFIG` environment variable
    /// 2. `./corridor.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> (Self, ConfigSource) {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded lighting config from {}", CONFIG_ENV_VAR);
                        return (config, ConfigSource::File(p));
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded lighting config from ./{}", DEFAULT_CONFIG_FILE);
                    return (config, ConfigSource::File(local));
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", DEFAULT_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", DEFAULT_CONFIG_FILE);
        (Self::default(), ConfigSource::Defaults)
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document. Unknown keys only warn.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate every value for internal consistency.
    ///
    /// All problems are collected so the operator sees them in one pass.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if !(-12..=14).contains(&self.location.timezone_offset_hours) {
            errors.push(format!(
                "location.timezone_offset_hours ({}) must be within -12..=14",
                self.location.timezone_offset_hours
            ));
        }

        if self.server.addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "server.addr ({}) is not a valid socket address",
                self.server.addr
            ));
        }

        if self.http.timeout_ms == 0 {
            errors.push("http.timeout_ms must be > 0".to_string());
        }
        if self.http.sensor_poll_timeout_ms == 0 {
            errors.push("http.sensor_poll_timeout_ms must be > 0".to_string());
        }

        if self.primary.host.trim().is_empty() {
            errors.push("primary.host must not be empty".to_string());
        }

        if self.secondary.enabled {
            if self.secondary.wled_host.trim().is_empty() {
                errors.push("secondary.wled_host must not be empty when secondary.enabled".to_string());
            }
            if self.secondary.psu_host.trim().is_empty() {
                errors.push("secondary.psu_host must not be empty when secondary.enabled".to_string());
            }
        }

        if self.motion_flag.backend == FlagBackend::Local
            && self.motion_flag.path.as_os_str().is_empty()
        {
            errors.push("motion_flag.path must not be empty for the local backend".to_string());
        }

        if self.adaptive.window_s == 0 {
            errors.push("adaptive.window_s must be > 0".to_string());
        }

        let t = &self.timers;
        if t.end_hold_s == 0 {
            errors.push("timers.end_hold_s must be > 0".to_string());
        }
        if t.manual_hold_s == 0 {
            errors.push("timers.manual_hold_s must be > 0".to_string());
        }
        if t.psu_keepalive_s == 0 {
            errors.push("timers.psu_keepalive_s must be > 0".to_string());
        }

        if self.sync.poll_ms == 0 {
            errors.push("sync.poll_ms must be > 0".to_string());
        }

        let mut seen = HashSet::new();
        for sensor in &self.sensors {
            if sensor.id.trim().is_empty() {
                errors.push("sensors: id must not be empty".to_string());
            } else if !seen.insert(sensor.id.as_str()) {
                errors.push(format!("sensors: duplicate id '{}'", sensor.id));
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_periods(&self.adaptive);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Location / Server / HTTP
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Added to the host clock's hour before period lookup.
    /// Leave at 0 when the host already runs on local time.
    #[serde(default)]
    pub timezone_offset_hours: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address for webhooks and the status API
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-call timeout for every device command
    #[serde(default = "default_http_timeout")]
    pub timeout_ms: u64,

    /// Timeout for the one-off sensor status poll at start-up
    #[serde(default = "default_sensor_poll_timeout")]
    pub sensor_poll_timeout_ms: u64,
}

fn default_http_timeout() -> u64 { 5_000 }
fn default_sensor_poll_timeout() -> u64 { 5_000 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_http_timeout(),
            sensor_poll_timeout_ms: default_sensor_poll_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sensor_poll_timeout(&self) -> Duration {
        Duration::from_millis(self.sensor_poll_timeout_ms)
    }
}

// ============================================================================
// Devices
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryConfig {
    /// Host (or host:port) of the dimmer's RPC endpoint
    #[serde(default = "default_primary_host")]
    pub host: String,

    /// Light component id on the dimmer
    #[serde(default)]
    pub light_id: u32,

    /// Input component id of the wall button
    #[serde(default)]
    pub input_id: u32,
}

fn default_primary_host() -> String {
    "192.168.0.DIMMER".to_string()
}

impl Default for PrimaryConfig {
    fn default() -> Self {
        Self {
            host: default_primary_host(),
            light_id: 0,
            input_id: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryConfig {
    /// Disable to run the dimmer alone; every secondary command becomes a no-op
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_wled_host")]
    pub wled_host: String,

    #[serde(default = "default_psu_host")]
    pub psu_host: String,

    #[serde(default)]
    pub psu_switch_id: u32,

    /// WLED playlist id for motion scenes (0 = unset)
    #[serde(default)]
    pub playlist_on_motion: i64,

    /// WLED preset id for motion scenes (0 = unset)
    #[serde(default)]
    pub preset_on_motion: i64,

    /// WLED effect id for motion scenes (0 = unset)
    #[serde(default)]
    pub effect_on_motion: i64,

    /// WLED state keys merged into every static (non-effect) payload
    #[serde(default = "default_color")]
    pub default_color: serde_json::Map<String, serde_json::Value>,
}

fn default_true() -> bool { true }

fn default_wled_host() -> String {
    "192.168.0.WLED".to_string()
}

fn default_psu_host() -> String {
    "192.168.0.PSU".to_string()
}

fn default_color() -> serde_json::Map<String, serde_json::Value> {
    let mut color = serde_json::Map::new();
    color.insert("cct".to_string(), serde_json::Value::from(127));
    color
}

impl Default for SecondaryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            wled_host: default_wled_host(),
            psu_host: default_psu_host(),
            psu_switch_id: 0,
            playlist_on_motion: 0,
            preset_on_motion: 0,
            effect_on_motion: 0,
            default_color: default_color(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagBackend {
    /// Virtual boolean component on the dimmer
    Shelly,
    /// sled key on the controller host
    Local,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionFlagConfig {
    #[serde(default = "default_flag_backend")]
    pub backend: FlagBackend,

    /// Virtual boolean id on the dimmer (shelly backend)
    #[serde(default = "default_vbool_id")]
    pub vbool_id: u32,

    /// sled directory (local backend)
    #[serde(default = "default_flag_path")]
    pub path: PathBuf,
}

fn default_flag_backend() -> FlagBackend { FlagBackend::Shelly }
fn default_vbool_id() -> u32 { 200 }
fn default_flag_path() -> PathBuf {
    PathBuf::from("./data/motion_flag")
}

impl Default for MotionFlagConfig {
    fn default() -> Self {
        Self {
            backend: default_flag_backend(),
            vbool_id: default_vbool_id(),
            path: default_flag_path(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorConfig {
    pub id: String,

    /// Polled once at start-up to pick up motion already in progress
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
}

fn default_sensors() -> Vec<SensorConfig> {
    vec![
        SensorConfig {
            id: "1".to_string(),
            status_url: Some("http://192.168.0.SENSOR1/status".to_string()),
        },
        SensorConfig {
            id: "2".to_string(),
            status_url: Some("http://192.168.0.SENSOR2/status".to_string()),
        },
    ]
}

// ============================================================================
// Adaptive Brightness
// ============================================================================

/// Sliding-window escalation across three time-of-day periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    /// When false the period defaults are used regardless of trigger count
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Trailing window for counting motion triggers
    #[serde(default = "default_window_s")]
    pub window_s: u64,

    /// Skip escalation entirely during the night period
    #[serde(default)]
    pub night_adaptive_disabled: bool,

    #[serde(default = "default_am_period")]
    pub am: PeriodConfig,

    #[serde(default = "default_pm_period")]
    pub pm: PeriodConfig,

    #[serde(default = "default_night_period")]
    pub night: PeriodConfig,
}

fn default_window_s() -> u64 { 600 }

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_s: default_window_s(),
            night_adaptive_disabled: false,
            am: default_am_period(),
            pm: default_pm_period(),
            night: default_night_period(),
        }
    }
}

impl AdaptiveConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_s)
    }
}

/// A `[start_hour, end_hour)` bracket of local time with its own defaults
/// and escalation table. A period whose end is before its start wraps past
/// midnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodConfig {
    pub start_hour: u32,
    pub end_hour: u32,
    pub default_brightness_primary: u8,
    pub default_brightness_secondary: u8,
    pub default_transition_primary_ms: u64,
    pub default_transition_secondary_ms: u64,
    #[serde(default)]
    pub steps: Vec<EscalationStep>,
}

/// Once the window holds at least `triggers` events the step overrides the
/// period defaults. Transitions left unset keep the period default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscalationStep {
    pub triggers: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_primary: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness_secondary: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_primary_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_secondary_ms: Option<u64>,
}

impl EscalationStep {
    /// Step with one brightness for both channels.
    pub fn shared(triggers: usize, brightness: u8) -> Self {
        Self {
            triggers,
            brightness: Some(brightness),
            ..Self::default()
        }
    }

    /// Step with separate primary and secondary brightness.
    pub fn split(triggers: usize, primary: u8, secondary: u8) -> Self {
        Self {
            triggers,
            brightness_primary: Some(primary),
            brightness_secondary: Some(secondary),
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn with_transitions(mut self, primary_ms: u64, secondary_ms: u64) -> Self {
        self.transition_primary_ms = Some(primary_ms);
        self.transition_secondary_ms = Some(secondary_ms);
        self
    }

    /// `(primary, secondary)` brightness; the per-channel pair wins over the
    /// shared value.
    pub fn levels(&self) -> Option<(u8, u8)> {
        let split = self.brightness_primary.zip(self.brightness_secondary);
        let shared = self.brightness.map(|b| (b, b));
        [split, shared].into_iter().flatten().next()
    }
}

fn default_am_period() -> PeriodConfig {
    PeriodConfig {
        start_hour: 6,
        end_hour: 17,
        default_brightness_primary: 20,
        default_brightness_secondary: 20,
        default_transition_primary_ms: 5_000,
        default_transition_secondary_ms: 2_500,
        steps: vec![
            EscalationStep::shared(1, 20).with_transitions(8_000, 1_000),
            EscalationStep::shared(3, 40),
            EscalationStep::shared(6, 60).with_transitions(500, 500),
        ],
    }
}

fn default_pm_period() -> PeriodConfig {
    PeriodConfig {
        start_hour: 17,
        end_hour: 22,
        default_brightness_primary: 15,
        default_brightness_secondary: 15,
        default_transition_primary_ms: 6_000,
        default_transition_secondary_ms: 3_000,
        steps: vec![
            EscalationStep::shared(1, 15),
            EscalationStep::split(5, 30, 20),
            EscalationStep::shared(10, 40),
        ],
    }
}

fn default_night_period() -> PeriodConfig {
    PeriodConfig {
        start_hour: 22,
        end_hour: 6,
        default_brightness_primary: 2,
        default_brightness_secondary: 2,
        default_transition_primary_ms: 12_000,
        default_transition_secondary_ms: 6_000,
        steps: vec![
            EscalationStep::shared(1, 2),
            EscalationStep::split(3, 20, 3),
            EscalationStep::shared(6, 10),
        ],
    }
}

// ============================================================================
// Timers
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimerConfig {
    /// Delay between "all sensors clear" and switching the light off
    #[serde(default = "default_end_hold")]
    pub end_hold_s: u64,

    /// How long a double press suspends motion control
    #[serde(default = "default_manual_hold")]
    pub manual_hold_s: u64,

    /// How long the strip's power supply stays up after the light goes off
    #[serde(default = "default_psu_keepalive")]
    pub psu_keepalive_s: u64,

    /// Settle time between powering the strip and commanding lights
    #[serde(default = "default_psu_stabilization")]
    pub psu_stabilization_delay_ms: u64,
}

fn default_end_hold() -> u64 { 12 }
fn default_manual_hold() -> u64 { 1_800 }
fn default_psu_keepalive() -> u64 { 600 }
fn default_psu_stabilization() -> u64 { 100 }

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            end_hold_s: default_end_hold(),
            manual_hold_s: default_manual_hold(),
            psu_keepalive_s: default_psu_keepalive(),
            psu_stabilization_delay_ms: default_psu_stabilization(),
        }
    }
}

impl TimerConfig {
    pub fn end_hold(&self) -> Duration {
        Duration::from_secs(self.end_hold_s)
    }

    pub fn manual_hold(&self) -> Duration {
        Duration::from_secs(self.manual_hold_s)
    }

    pub fn psu_keepalive(&self) -> Duration {
        Duration::from_secs(self.psu_keepalive_s)
    }

    pub fn psu_stabilization(&self) -> Duration {
        Duration::from_millis(self.psu_stabilization_delay_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualTransitions {
    #[serde(default = "default_manual_on")]
    pub on: u64,
    #[serde(default = "default_manual_off")]
    pub off: u64,
}

fn default_manual_on() -> u64 { 300 }
fn default_manual_off() -> u64 { 1_500 }

impl Default for ManualTransitions {
    fn default() -> Self {
        Self {
            on: default_manual_on(),
            off: default_manual_off(),
        }
    }
}

impl ManualTransitions {
    pub fn on(&self) -> Duration {
        Duration::from_millis(self.on)
    }

    pub fn off(&self) -> Duration {
        Duration::from_millis(self.off)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
}

fn default_poll_ms() -> u64 { 2_000 }

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_ms: default_poll_ms(),
        }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.poll_ms)
    }
}

// ============================================================================
// Tests
// ============================================================================
