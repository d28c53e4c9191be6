//! Controller-wide constants that are not operator-tunable.
//!
//! Grouped by subsystem for easy discovery.

use std::time::Duration;

// ============================================================================
// Configuration
// ============================================================================

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "CORRIDOR_CONFIG";

/// Config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "corridor.toml";

// ============================================================================
// Arbitration
// ============================================================================

/// Grace period after a sensor ends before the end-hold is armed.
///
/// A second sensor firing inside this window keeps the light on.
pub const MOTION_END_DEBOUNCE: Duration = Duration::from_millis(250);

/// Wait after a long press ends before reading the dimmer's final level.
pub const DIMMING_SETTLE: Duration = Duration::from_millis(250);

/// How long status echoes of our own commands are ignored after they complete.
pub const SELF_DRIVEN_GUARD: Duration = Duration::from_millis(500);

/// Status `source` values that mean a person touched the wall control.
pub const MANUAL_SOURCES: &[&str] = &["button", "dim", "double"];

// ============================================================================
// Event Queue
// ============================================================================

/// Inbound events buffered between the HTTP surface and the event loop.
pub const EVENT_QUEUE_CAPACITY: usize = 256;

// ============================================================================
// Devices
// ============================================================================

/// Request id sent with every dimmer RPC call.
pub const RPC_REQUEST_ID: u32 = 1;

// ============================================================================
// Supervision
// ============================================================================

/// How long tasks get to finish after shutdown starts before they are aborted.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
