//! Lighting Configuration Module
//!
//! Every tunable of the corridor controller (device addresses, period
//! tables, hold timers, transitions) loaded from a TOML file.
//!
//! ## Loading Order
//!
//! 1. `CORRIDOR_CONFIG` environment variable (path to TOML file)
//! 2. `corridor.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is immutable and shared as `Arc<LightingConfig>`.
//!
//! ```ignore
//! let (config, source) = LightingConfig::load();
//! let config = Arc::new(config);
//! ```

mod lighting_config;
pub mod defaults;
pub mod validation;

pub use lighting_config::*;
