//! Controller state: everything the arbitration logic reads or mutates,
//! owned in one place.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::adaptive::TriggerWindow;

/// Who currently has authority over the light.
///
/// A long press during a manual hold keeps the hold alive underneath the
/// dimming gesture, so releasing the button drops back into the hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ControlMode {
    #[default]
    Automatic,
    ManualHold,
    ManualDimming { hold_active: bool },
}

impl ControlMode {
    /// Motion commands are suppressed while this is true.
    pub const fn is_manual_hold(self) -> bool {
        matches!(self, Self::ManualHold | Self::ManualDimming { hold_active: true })
    }

    pub const fn is_dimming(self) -> bool {
        matches!(self, Self::ManualDimming { .. })
    }

    /// Mode after a double press.
    #[must_use]
    pub const fn with_hold(self) -> Self {
        match self {
            Self::ManualDimming { .. } => Self::ManualDimming { hold_active: true },
            _ => Self::ManualHold,
        }
    }

    /// Mode after the hold expires or the light is switched off.
    #[must_use]
    pub const fn without_hold(self) -> Self {
        match self {
            Self::ManualDimming { .. } => Self::ManualDimming { hold_active: false },
            _ => Self::Automatic,
        }
    }

    /// Mode after a long press starts.
    #[must_use]
    pub const fn start_dimming(self) -> Self {
        Self::ManualDimming {
            hold_active: self.is_manual_hold(),
        }
    }

    /// Mode after the long press is released.
    #[must_use]
    pub const fn end_dimming(self) -> Self {
        match self {
            Self::ManualDimming { hold_active: true } => Self::ManualHold,
            Self::ManualDimming { hold_active: false } => Self::Automatic,
            other => other,
        }
    }
}

/// Coarse lifecycle phase reported by the state API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    AutoLit,
    ManualHold,
    ManualDimming,
}

/// Tracks which configured sensors currently report motion.
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    active: BTreeMap<String, bool>,
}

impl SensorRegistry {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: ids.into_iter().map(|id| (id.into(), false)).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.active.contains_key(id)
    }

    /// Returns false (and records nothing) for an unknown sensor.
    pub fn set(&mut self, id: &str, active: bool) -> bool {
        match self.active.get_mut(id) {
            Some(slot) => {
                *slot = active;
                true
            }
            None => false,
        }
    }

    pub fn any_active(&self) -> bool {
        self.active.values().any(|a| *a)
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active
            .iter()
            .filter(|(_, a)| **a)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

/// Last level pushed to the secondary strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", content = "percent", rename_all = "snake_case")]
pub enum SecondaryLevel {
    #[default]
    Unknown,
    Off,
    Percent(u8),
}

impl SecondaryLevel {
    pub const fn is_off(self) -> bool {
        matches!(self, Self::Off | Self::Percent(0))
    }

    /// Whether pushing `pct` would change nothing.
    pub const fn matches(self, pct: u8) -> bool {
        match self {
            Self::Percent(p) => p == pct,
            Self::Off => pct == 0,
            Self::Unknown => false,
        }
    }
}

/// Suppresses redundant secondary commands. Not authoritative.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SyncCache {
    pub last_secondary: SecondaryLevel,
    /// Primary level of the most recent motion scene. Reported by the state
    /// API only; suppression keys off `last_secondary`.
    pub last_motion_brightness: Option<u8>,
}

#[derive(Debug)]
pub struct ControllerState {
    pub mode: ControlMode,
    pub sensors: SensorRegistry,
    pub window: TriggerWindow,
    pub sync: SyncCache,
    /// Set while our own primary command (plus a short grace) is in effect
    pub self_driven: bool,
    pub sync_in_flight: bool,
    /// A motion scene is applied and has not been switched off yet
    pub auto_lit: bool,
    /// Bumped by every off notification. Continuations that captured it
    /// before an await compare it afterwards to detect a switch-off.
    pub off_epoch: u64,
}

impl ControllerState {
    pub fn new(sensors: SensorRegistry, window: TriggerWindow) -> Self {
        Self {
            mode: ControlMode::Automatic,
            sensors,
            window,
            sync: SyncCache::default(),
            self_driven: false,
            sync_in_flight: false,
            auto_lit: false,
            off_epoch: 0,
        }
    }

    pub const fn phase(&self) -> Phase {
        match self.mode {
            ControlMode::ManualDimming { .. } => Phase::ManualDimming,
            ControlMode::ManualHold => Phase::ManualHold,
            ControlMode::Automatic if self.auto_lit => Phase::AutoLit,
            ControlMode::Automatic => Phase::Idle,
        }
    }
}
