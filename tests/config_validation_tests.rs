//! Config Validation Tests
//!
//! Typo detection on raw TOML and range validation on parsed configs,
//! exercised independently of the controller.

use std::io::Write;

use corridor_lighting::config::validation::{
    known_config_keys, suggest_correction, validate_periods, validate_unknown_keys,
};
use corridor_lighting::config::{EscalationStep, FlagBackend};
use corridor_lighting::{ConfigError, LightingConfig};

fn validation_errors(result: Result<LightingConfig, ConfigError>) -> Vec<String> {
    match result {
        Err(ConfigError::Validation(errors)) => errors,
        Err(other) => panic!("expected validation error, got {other}"),
        Ok(_) => panic!("expected validation error, config was accepted"),
    }
}

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_timer_key_warns_with_suggestion() {
    let toml_str = r#"
[timers]
end_hold_sec = 20
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "timers.end_hold_sec");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("timers.end_hold_s"));
    assert!(warnings[0].to_string().contains("did you mean 'timers.end_hold_s'"));
}

#[test]
fn typo_inside_escalation_step_warns() {
    let toml_str = r#"
[adaptive.pm]
start_hour = 17
end_hour = 22
default_brightness_primary = 15
default_brightness_secondary = 15
default_transition_primary_ms = 6000
default_transition_secondary_ms = 3000

[[adaptive.pm.steps]]
triggers = 1
brightnes = 15
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("adaptive.pm.steps.brightness")
    );
}

#[test]
fn unrelated_key_has_no_suggestion() {
    let warnings = validate_unknown_keys("completely_unrelated_setting = 1\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn realistic_config_produces_zero_warnings() {
    let toml_str = r#"
[location]
timezone_offset_hours = 2

[server]
addr = "0.0.0.0:8080"

[primary]
host = "192.168.0.10"

[secondary]
enabled = true
wled_host = "192.168.0.11"
psu_host = "192.168.0.12"
preset_on_motion = 3

[secondary.default_color]
cct = 200
seg = { fx = 0 }

[motion_flag]
backend = "local"
path = "/var/lib/corridor/flag"

[adaptive]
window_s = 300
night_adaptive_disabled = true

[timers]
end_hold_s = 30

[manual_transitions_ms]
on = 250

[[sensors]]
id = "hall"
status_url = "http://192.168.0.20/status"
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");
}

#[test]
fn malformed_toml_is_left_to_the_parser() {
    assert!(validate_unknown_keys("[timers\nend_hold_s = ").is_empty());
    assert!(matches!(
        LightingConfig::from_toml_str("[timers\nend_hold_s = "),
        Err(ConfigError::Parse(..))
    ));
}

#[test]
fn suggestion_prefers_closest_key() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("sync.pol_ms", &known).as_deref(),
        Some("sync.poll_ms")
    );
    assert_eq!(
        suggest_correction("adaptive.night.end_huor", &known).as_deref(),
        Some("adaptive.night.end_hour")
    );
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn default_config_is_valid() {
    assert!(LightingConfig::default().validate().is_ok());
    let (errors, warnings) = validate_periods(&LightingConfig::default().adaptive);
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

#[test]
fn all_problems_are_reported_together() {
    let toml_str = r#"
[location]
timezone_offset_hours = 20

[server]
addr = "not-an-address"

[timers]
end_hold_s = 0

[sync]
poll_ms = 0

[[sensors]]
id = "1"

[[sensors]]
id = "1"
"#;
    let errors = validation_errors(LightingConfig::from_toml_str(toml_str));
    assert_eq!(errors.len(), 5, "got: {errors:?}");
    assert!(errors.iter().any(|e| e.contains("timezone_offset_hours")));
    assert!(errors.iter().any(|e| e.contains("server.addr")));
    assert!(errors.iter().any(|e| e.contains("end_hold_s")));
    assert!(errors.iter().any(|e| e.contains("poll_ms")));
    assert!(errors.iter().any(|e| e.contains("duplicate id '1'")));
}

#[test]
fn out_of_range_period_values_are_errors() {
    let mut config = LightingConfig::default();
    config.adaptive.am.start_hour = 24;
    config.adaptive.pm.default_brightness_primary = 120;
    config.adaptive.night.steps.push(EscalationStep::shared(9, 101));

    let errors = match config.validate() {
        Err(ConfigError::Validation(errors)) => errors,
        other => panic!("expected validation error, got {other:?}"),
    };
    assert_eq!(errors.len(), 3, "got: {errors:?}");
    assert!(errors[0].contains("adaptive.am.start_hour"));
    assert!(errors[1].contains("adaptive.pm.default_brightness_primary"));
    assert!(errors[2].contains("adaptive.night.steps[3]"));
}

#[test]
fn steps_must_ascend() {
    let mut config = LightingConfig::default();
    config.adaptive.pm.steps = vec![
        EscalationStep::shared(5, 30),
        EscalationStep::shared(5, 40),
        EscalationStep::shared(0, 50),
    ];
    let (errors, _) = validate_periods(&config.adaptive);
    assert_eq!(errors.len(), 2, "got: {errors:?}");
    assert!(errors[0].contains("steps[1].triggers = 5"));
    assert!(errors[1].contains("steps[2].triggers must be >= 1"));
}

#[test]
fn step_without_brightness_is_error_and_half_split_warns() {
    let mut config = LightingConfig::default();
    config.adaptive.am.steps = vec![EscalationStep {
        triggers: 1,
        brightness: None,
        brightness_primary: Some(30),
        brightness_secondary: None,
        transition_primary_ms: None,
        transition_secondary_ms: None,
    }];
    let (errors, warnings) = validate_periods(&config.adaptive);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("needs 'brightness'"));
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].field, "adaptive.am.steps[0]");
}

#[test]
fn empty_period_only_warns() {
    let mut config = LightingConfig::default();
    config.adaptive.am.end_hour = config.adaptive.am.start_hour;
    let (errors, warnings) = validate_periods(&config.adaptive);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(config.validate().is_ok());
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn load_from_file_applies_overrides_over_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[timers]
end_hold_s = 45

[motion_flag]
backend = "local"
path = "/tmp/corridor-flag"

[[sensors]]
id = "front"
"#
    )
    .unwrap();

    let config = LightingConfig::load_from_file(file.path()).unwrap();
    assert_eq!(config.timers.end_hold_s, 45);
    assert_eq!(config.timers.manual_hold_s, 1_800);
    assert_eq!(config.motion_flag.backend, FlagBackend::Local);
    assert_eq!(config.sensors.len(), 1);
    assert_eq!(config.sensors[0].id, "front");
    assert!(config.sensors[0].status_url.is_none());
    assert_eq!(config.adaptive.pm.steps.len(), 3);
}

#[test]
fn load_from_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match LightingConfig::load_from_file(&path) {
        Err(ConfigError::Io(p, _)) => assert_eq!(p, path),
        other => panic!("expected Io error, got {other:?}"),
    }
}

#[test]
fn parse_error_names_the_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[timers]\nend_hold_s = \"twelve\"").unwrap();
    match LightingConfig::load_from_file(file.path()) {
        Err(ConfigError::Parse(p, _)) => assert_eq!(p, file.path()),
        other => panic!("expected Parse error, got {other:?}"),
    }
}

#[test]
fn serialized_config_reloads_identically() {
    let mut config = LightingConfig::default();
    config.adaptive.night_adaptive_disabled = true;
    config.timers.end_hold_s = 20;

    let text = config.to_toml().unwrap();
    assert!(validate_unknown_keys(&text).is_empty());

    let reloaded = LightingConfig::from_toml_str(&text).unwrap();
    assert!(reloaded.adaptive.night_adaptive_disabled);
    assert_eq!(reloaded.timers.end_hold_s, 20);
    assert_eq!(reloaded.adaptive.pm.steps, config.adaptive.pm.steps);
    assert_eq!(reloaded.secondary.default_color, config.secondary.default_color);
}
