//! Shared data structures for the corridor lighting controller
//!
//! Inbound signals as the event loop sees them, and the primary light's
//! status as reported by the dimmer.

use serde::{Deserialize, Serialize};

// ============================================================================
// Inbound Signals
// ============================================================================

/// Physical wall-button gesture reported by the dimmer's input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonGesture {
    /// Double press: suspend motion control for the manual-hold period
    Double,
    /// Long press began: the user is dimming by hand
    LongPressStart,
    /// Button released after a long press
    LongPressEnd,
}

impl ButtonGesture {
    /// Map the dimmer's input event name to a gesture.
    pub fn from_event(event: &str) -> Option<Self> {
        match event {
            "double_push" => Some(Self::Double),
            "long_push" => Some(Self::LongPressStart),
            "btn_up" => Some(Self::LongPressEnd),
            _ => None,
        }
    }
}

impl std::fmt::Display for ButtonGesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Double => write!(f, "double_push"),
            Self::LongPressStart => write!(f, "long_push"),
            Self::LongPressEnd => write!(f, "btn_up"),
        }
    }
}

/// On/off change reported by the primary light.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDelta {
    /// New output state
    pub output: bool,
    /// Brightness after the change, when the dimmer reports it
    #[serde(default)]
    pub brightness: Option<u8>,
    /// What caused the change (`button`, `dim`, `double`, `http`, ...)
    #[serde(default)]
    pub source: String,
}

impl StatusDelta {
    /// True when the change came from someone at the wall control.
    pub fn is_manual(&self) -> bool {
        crate::config::defaults::MANUAL_SOURCES.contains(&self.source.as_str())
    }
}

/// Everything the event loop consumes, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlEvent {
    MotionStart(String),
    MotionEnd(String),
    Button(ButtonGesture),
    Status(StatusDelta),
}

impl ControlEvent {
    /// Short name for logs.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MotionStart(_) => "motion_start",
            Self::MotionEnd(_) => "motion_end",
            Self::Button(_) => "button",
            Self::Status(_) => "status",
        }
    }
}

// ============================================================================
// Device State
// ============================================================================

/// Snapshot of the primary light from `Light.GetStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrimaryStatus {
    pub output: bool,
    #[serde(default)]
    pub brightness: Option<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_event_names() {
        assert_eq!(ButtonGesture::from_event("double_push"), Some(ButtonGesture::Double));
        assert_eq!(ButtonGesture::from_event("long_push"), Some(ButtonGesture::LongPressStart));
        assert_eq!(ButtonGesture::from_event("btn_up"), Some(ButtonGesture::LongPressEnd));
        assert_eq!(ButtonGesture::from_event("single_push"), None);
        assert_eq!(ButtonGesture::LongPressEnd.to_string(), "btn_up");
    }

    #[test]
    fn test_manual_sources() {
        let mut delta = StatusDelta {
            output: true,
            brightness: Some(40),
            source: "button".to_string(),
        };
        assert!(delta.is_manual());
        delta.source = "dim".to_string();
        assert!(delta.is_manual());
        delta.source = "http".to_string();
        assert!(!delta.is_manual());
    }

    #[test]
    fn test_status_delta_optional_fields() {
        let delta: StatusDelta = serde_json::from_str(r#"{"output": false}"#).unwrap();
        assert!(!delta.output);
        assert_eq!(delta.brightness, None);
        assert_eq!(delta.source, "");
    }
}
