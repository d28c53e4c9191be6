//! Config validation: unknown-key detection with Levenshtein suggestions
//! and period/step range checks.
//!
//! The raw TOML is first walked as a `toml::Value` tree and every key path is
//! compared against the known field names. Unknown keys produce warnings with
//! a "did you mean?" hint and never fail the load.

use std::collections::HashSet;

use super::lighting_config::{AdaptiveConfig, PeriodConfig};

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

const PERIOD_KEYS: &[&str] = &[
    "start_hour",
    "end_hour",
    "default_brightness_primary",
    "default_brightness_secondary",
    "default_transition_primary_ms",
    "default_transition_secondary_ms",
    "steps",
    "steps.triggers",
    "steps.brightness",
    "steps.brightness_primary",
    "steps.brightness_secondary",
    "steps.transition_primary_ms",
    "steps.transition_secondary_ms",
];

/// Tables whose contents are passed through to a device untouched.
const FREE_FORM_TABLES: &[&str] = &["secondary.default_color"];

/// Returns the complete set of valid dotted key paths for `LightingConfig`.
///
/// Array-of-table entries share their parent's path, so `[[sensors]] id`
/// appears as `sensors.id`. Must be kept in step with lighting_config.rs.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        "location",
        "location.timezone_offset_hours",
        "server",
        "server.addr",
        "http",
        "http.timeout_ms",
        "http.sensor_poll_timeout_ms",
        "primary",
        "primary.host",
        "primary.light_id",
        "primary.input_id",
        "secondary",
        "secondary.enabled",
        "secondary.wled_host",
        "secondary.psu_host",
        "secondary.psu_switch_id",
        "secondary.playlist_on_motion",
        "secondary.preset_on_motion",
        "secondary.effect_on_motion",
        "secondary.default_color",
        "motion_flag",
        "motion_flag.backend",
        "motion_flag.vbool_id",
        "motion_flag.path",
        "adaptive",
        "adaptive.enabled",
        "adaptive.window_s",
        "adaptive.night_adaptive_disabled",
        "timers",
        "timers.end_hold_s",
        "timers.manual_hold_s",
        "timers.psu_keepalive_s",
        "timers.psu_stabilization_delay_ms",
        "manual_transitions_ms",
        "manual_transitions_ms.on",
        "manual_transitions_ms.off",
        "sync",
        "sync.poll_ms",
        "sensors",
        "sensors.id",
        "sensors.status_url",
    ];

    let mut keys: HashSet<String> = fixed.iter().map(|k| (*k).to_string()).collect();
    for period in ["am", "pm", "night"] {
        keys.insert(format!("adaptive.{period}"));
        for k in PERIOD_KEYS {
            keys.insert(format!("adaptive.{period}.{k}"));
        }
    }
    keys
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// A table `{ a = { b = 1, c = 2 } }` yields `["a", "a.b", "a.c"]`. Tables
/// inside arrays are walked under the array's own path.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    let Some(table) = value.as_table() else {
        return keys;
    };
    for (k, v) in table {
        let path = if prefix.is_empty() {
            k.clone()
        } else {
            format!("{prefix}.{k}")
        };
        keys.push(path.clone());
        if FREE_FORM_TABLES.contains(&path.as_str()) {
            continue;
        }
        match v {
            toml::Value::Table(_) => keys.extend(walk_toml_keys(v, &path)),
            toml::Value::Array(items) => {
                for item in items.iter().filter(|i| i.is_table()) {
                    for nested in walk_toml_keys(item, &path) {
                        if !keys.contains(&nested) {
                            keys.push(nested);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b_chars.len();
    }
    if b_chars.is_empty() {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_chars.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    known
        .iter()
        .map(|k| (k, levenshtein(unknown, k)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by(|(ka, da), (kb, db)| da.cmp(db).then_with(|| ka.cmp(kb)))
        .map(|(k, _)| k.clone())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// Parse errors are left to serde, which reports them with line numbers.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Period Validation
// ============================================================================

/// Validate the three adaptive periods.
///
/// Returns (errors, warnings): errors are values the scene engine cannot
/// use, warnings are legal but almost certainly unintended.
pub fn validate_periods(adaptive: &AdaptiveConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    for (name, period) in [
        ("am", &adaptive.am),
        ("pm", &adaptive.pm),
        ("night", &adaptive.night),
    ] {
        validate_period(name, period, &mut errors, &mut warnings);
    }

    (errors, warnings)
}

fn validate_period(
    name: &str,
    period: &PeriodConfig,
    errors: &mut Vec<String>,
    warnings: &mut Vec<ValidationWarning>,
) {
    let prefix = format!("adaptive.{name}");

    for (field, hour) in [("start_hour", period.start_hour), ("end_hour", period.end_hour)] {
        if hour > 23 {
            errors.push(format!("{prefix}.{field} = {hour} must be within 0..=23"));
        }
    }
    if period.start_hour == period.end_hour {
        warnings.push(ValidationWarning {
            field: format!("{prefix}.start_hour"),
            message: format!("{prefix} starts and ends at hour {}, so it never matches", period.start_hour),
            suggestion: None,
        });
    }

    for (field, pct) in [
        ("default_brightness_primary", period.default_brightness_primary),
        ("default_brightness_secondary", period.default_brightness_secondary),
    ] {
        if pct > 100 {
            errors.push(format!("{prefix}.{field} = {pct} must be within 0..=100"));
        }
    }

    let mut last_triggers = 0usize;
    for (i, step) in period.steps.iter().enumerate() {
        let at = format!("{prefix}.steps[{i}]");
        if step.triggers == 0 {
            errors.push(format!("{at}.triggers must be >= 1"));
        } else if step.triggers <= last_triggers {
            errors.push(format!(
                "{at}.triggers = {} must be greater than the previous step ({last_triggers})",
                step.triggers
            ));
        }
        last_triggers = last_triggers.max(step.triggers);

        let split_given = step.brightness_primary.is_some() && step.brightness_secondary.is_some();
        if step.brightness.is_none() && !split_given {
            errors.push(format!(
                "{at} needs 'brightness' or both 'brightness_primary' and 'brightness_secondary'"
            ));
        }
        if step.brightness.is_none()
            && step.brightness_primary.is_some() != step.brightness_secondary.is_some()
        {
            warnings.push(ValidationWarning {
                field: at.clone(),
                message: format!("{at} sets only one of brightness_primary/brightness_secondary"),
                suggestion: None,
            });
        }

        for pct in [step.brightness, step.brightness_primary, step.brightness_secondary]
            .into_iter()
            .flatten()
        {
            if pct > 100 {
                errors.push(format!("{at} brightness {pct} must be within 0..=100"));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationStep;

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("end_hold_s", "end_hold_s"), 0);
        assert_eq!(levenshtein("endhold_s", "end_hold_s"), 1);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_descends_into_arrays_of_tables() {
        let toml: toml::Value = r#"
            [[sensors]]
            id = "1"
            [[sensors]]
            id = "2"
            status_url = "http://x/status"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert_eq!(keys, vec!["sensors", "sensors.id", "sensors.status_url"]);
    }

    #[test]
    fn test_free_form_color_table_not_flagged() {
        let raw = r#"
            [secondary.default_color]
            cct = 127
            col = [[255, 160, 0]]
        "#;
        assert!(validate_unknown_keys(raw).is_empty());
    }

    #[test]
    fn test_typo_suggests_correction() {
        let raw = r#"
            [timers]
            end_hold = 20
        "#;
        let warnings = validate_unknown_keys(raw);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "timers.end_hold");
        assert_eq!(warnings[0].suggestion.as_deref(), Some("timers.end_hold_s"));
    }

    #[test]
    fn test_step_keys_known_in_every_period() {
        let raw = r#"
            [[adaptive.night.steps]]
            triggers = 1
            brightness = 2
            transition_primary_ms = 100
        "#;
        assert!(validate_unknown_keys(raw).is_empty());
    }

    #[test]
    fn test_defaults_have_no_period_errors() {
        let (errors, warnings) = validate_periods(&AdaptiveConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_non_ascending_steps_rejected() {
        let mut adaptive = AdaptiveConfig::default();
        adaptive.pm.steps = vec![EscalationStep::shared(3, 10), EscalationStep::shared(3, 20)];
        let (errors, _) = validate_periods(&adaptive);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("adaptive.pm.steps[1]"));
    }

    #[test]
    fn test_step_without_brightness_rejected() {
        let mut adaptive = AdaptiveConfig::default();
        adaptive.am.steps = vec![EscalationStep {
            triggers: 1,
            brightness_primary: Some(10),
            ..EscalationStep::default()
        }];
        let (errors, warnings) = validate_periods(&adaptive);
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        let mut adaptive = AdaptiveConfig::default();
        adaptive.night.end_hour = 24;
        adaptive.night.default_brightness_primary = 101;
        adaptive.night.steps = vec![EscalationStep::shared(1, 150)];
        let (errors, _) = validate_periods(&adaptive);
        assert_eq!(errors.len(), 3, "{errors:?}");
    }
}
