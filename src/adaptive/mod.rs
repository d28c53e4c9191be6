//! Adaptive Scene Engine
//!
//! Pure mapping from (trigger count, local hour) to the brightness and
//! transition of both channels. Busy corridors get brighter within a period;
//! the period itself follows the time of day.
//!
//! No I/O and no state: the controller owns the [`TriggerWindow`] and passes
//! its length in.

mod window;

pub use window::TriggerWindow;

use serde::Serialize;

use crate::config::{AdaptiveConfig, PeriodConfig};

/// Brightness/transition recommendation for one motion event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Scene {
    pub primary_brightness: u8,
    pub secondary_brightness: u8,
    pub primary_transition_ms: u64,
    pub secondary_transition_ms: u64,
}

impl Scene {
    fn defaults_of(period: &PeriodConfig) -> Self {
        Self {
            primary_brightness: period.default_brightness_primary,
            secondary_brightness: period.default_brightness_secondary,
            primary_transition_ms: period.default_transition_primary_ms,
            secondary_transition_ms: period.default_transition_secondary_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodKind {
    Am,
    Pm,
    Night,
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Am => write!(f, "AM"),
            Self::Pm => write!(f, "PM"),
            Self::Night => write!(f, "NIGHT"),
        }
    }
}

/// Host hour shifted by the configured offset, wrapped to 0-23.
pub fn local_hour(host_hour: u32, offset_hours: i32) -> u32 {
    let shifted = i64::from(host_hour) + i64::from(offset_hours);
    // rem_euclid(24) is always within 0..24
    u32::try_from(shifted.rem_euclid(24)).unwrap_or(0)
}

fn claims(period: &PeriodConfig, hour: u32) -> bool {
    hour >= period.start_hour && hour < period.end_hour
}

/// Pick the period for a local hour.
///
/// PM is checked before AM, and NIGHT takes every hour neither claims,
/// whatever its own configured range says.
pub fn resolve_period(adaptive: &AdaptiveConfig, hour: u32) -> (PeriodKind, &PeriodConfig) {
    if claims(&adaptive.pm, hour) {
        (PeriodKind::Pm, &adaptive.pm)
    } else if claims(&adaptive.am, hour) {
        (PeriodKind::Am, &adaptive.am)
    } else {
        (PeriodKind::Night, &adaptive.night)
    }
}

/// Scene for `trigger_count` events in the window at `hour` (local time).
pub fn compute_scene(adaptive: &AdaptiveConfig, trigger_count: usize, hour: u32) -> Scene {
    let (kind, period) = resolve_period(adaptive, hour);
    let mut scene = Scene::defaults_of(period);

    if !adaptive.enabled || (kind == PeriodKind::Night && adaptive.night_adaptive_disabled) {
        return scene;
    }

    let Some(step) = period
        .steps
        .iter()
        .rev()
        .find(|s| trigger_count >= s.triggers)
    else {
        return scene;
    };

    if let Some((primary, secondary)) = step.levels() {
        scene.primary_brightness = primary;
        scene.secondary_brightness = secondary;
    }
    if let Some(ms) = step.transition_primary_ms {
        scene.primary_transition_ms = ms;
    }
    if let Some(ms) = step.transition_secondary_ms {
        scene.secondary_transition_ms = ms;
    }
    scene
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(scene: Scene) -> (u8, u8) {
        (scene.primary_brightness, scene.secondary_brightness)
    }

    #[test]
    fn test_local_hour_wraps() {
        assert_eq!(local_hour(23, 2), 1);
        assert_eq!(local_hour(1, -3), 22);
        assert_eq!(local_hour(12, 0), 12);
        assert_eq!(local_hour(0, 14), 14);
    }

    #[test]
    fn test_period_boundaries() {
        let cfg = AdaptiveConfig::default();
        assert_eq!(resolve_period(&cfg, 5).0, PeriodKind::Night);
        assert_eq!(resolve_period(&cfg, 6).0, PeriodKind::Am);
        assert_eq!(resolve_period(&cfg, 16).0, PeriodKind::Am);
        assert_eq!(resolve_period(&cfg, 17).0, PeriodKind::Pm);
        assert_eq!(resolve_period(&cfg, 21).0, PeriodKind::Pm);
        assert_eq!(resolve_period(&cfg, 22).0, PeriodKind::Night);
        assert_eq!(resolve_period(&cfg, 0).0, PeriodKind::Night);
    }

    #[test]
    fn test_pm_checked_before_am_on_overlap() {
        let mut cfg = AdaptiveConfig::default();
        cfg.am.end_hour = 20;
        assert_eq!(resolve_period(&cfg, 18).0, PeriodKind::Pm);
        assert_eq!(resolve_period(&cfg, 16).0, PeriodKind::Am);
    }

    #[test]
    fn test_night_is_catch_all_regardless_of_range() {
        let mut cfg = AdaptiveConfig::default();
        cfg.night.start_hour = 3;
        cfg.night.end_hour = 4;
        assert_eq!(resolve_period(&cfg, 23).0, PeriodKind::Night);
    }

    #[test]
    fn test_pm_escalation() {
        let cfg = AdaptiveConfig::default();
        assert_eq!(levels(compute_scene(&cfg, 0, 18)), (15, 15));
        assert_eq!(levels(compute_scene(&cfg, 1, 18)), (15, 15));
        assert_eq!(levels(compute_scene(&cfg, 4, 18)), (15, 15));
        assert_eq!(levels(compute_scene(&cfg, 5, 18)), (30, 20));
        assert_eq!(levels(compute_scene(&cfg, 9, 18)), (30, 20));
        assert_eq!(levels(compute_scene(&cfg, 10, 18)), (40, 40));
        assert_eq!(levels(compute_scene(&cfg, 100, 18)), (40, 40));
    }

    #[test]
    fn test_step_transitions_fall_through_to_defaults() {
        let cfg = AdaptiveConfig::default();
        let first = compute_scene(&cfg, 1, 9);
        assert_eq!((first.primary_transition_ms, first.secondary_transition_ms), (8_000, 1_000));

        let second = compute_scene(&cfg, 3, 9);
        assert_eq!(levels(second), (40, 40));
        assert_eq!((second.primary_transition_ms, second.secondary_transition_ms), (5_000, 2_500));
    }

    #[test]
    fn test_night_adaptive_disabled_uses_defaults() {
        let mut cfg = AdaptiveConfig::default();
        cfg.night_adaptive_disabled = true;
        let scene = compute_scene(&cfg, 50, 23);
        assert_eq!(levels(scene), (2, 2));
        assert_eq!(scene.primary_transition_ms, 12_000);

        // Only the night period is affected
        assert_eq!(levels(compute_scene(&cfg, 10, 18)), (40, 40));
    }

    #[test]
    fn test_adaptive_disabled_everywhere() {
        let mut cfg = AdaptiveConfig::default();
        cfg.enabled = false;
        assert_eq!(levels(compute_scene(&cfg, 10, 18)), (15, 15));
        assert_eq!(levels(compute_scene(&cfg, 6, 9)), (20, 20));
    }

    #[test]
    fn test_night_split_step() {
        let cfg = AdaptiveConfig::default();
        assert_eq!(levels(compute_scene(&cfg, 3, 2)), (20, 3));
        assert_eq!(levels(compute_scene(&cfg, 6, 2)), (10, 10));
    }
}
