//! Corridor Lighting: motion-driven adaptive lighting controller
//!
//! Coordinates a dimmable corridor light and a WLED strip (plus the strip's
//! power supply) so they respond together to occupancy sensors and to
//! people at the wall button.
//!
//! ## Architecture
//!
//! - **Scene Engine** ([`adaptive`]): pure brightness/transition choice from
//!   time of day and recent trigger count
//! - **Controller** ([`controller`]): event arbitration, timers and the
//!   secondary synchronisation loop
//! - **Devices** ([`devices`]): Shelly RPC, WLED JSON and sensor adapters
//! - **API** ([`api`]): webhook targets and read-only status views
//! - **Supervisor** ([`supervisor`]): runs the server and event loop under
//!   one shutdown token

pub mod adaptive;
pub mod api;
pub mod clock;
pub mod config;
pub mod controller;
pub mod devices;
pub mod supervisor;
pub mod types;

// Re-export configuration
pub use config::{ConfigError, LightingConfig};

// Re-export the controller surface
pub use controller::{event_channel, run_event_loop, Controller, EventSender};

// Re-export commonly used types
pub use adaptive::{PeriodKind, Scene, TriggerWindow};
pub use devices::{DeviceError, Devices};
pub use types::{ButtonGesture, ControlEvent, PrimaryStatus, StatusDelta};
