//! Integration tests for settings loading
//!
//! - Defaults when no settings file exists
//! - Settings path override via environment variable
//! - Partial files keep defaults for missing keys
//! - Malformed or invalid files never prevent startup

use std::io::Write;
use std::time::Duration;
use webui_controller::config::{ControllerSettings, SettingsManager, SETTINGS_ENV_VAR};
use webui_controller::error::ConfigError;
use webui_controller::process::ShutdownPolicy;

#[test]
fn test_env_override_is_used() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.json");
    std::fs::write(
        &path,
        r#"{"command": "/opt/webui/bin/open-webui", "service_url": "http://localhost:3000"}"#,
    )
    .unwrap();

    // Only this test touches the variable
    std::env::set_var(SETTINGS_ENV_VAR, &path);
    assert_eq!(SettingsManager::settings_path(), Some(path.clone()));
    let settings = SettingsManager::load();
    std::env::remove_var(SETTINGS_ENV_VAR);

    assert_eq!(settings.command, "/opt/webui/bin/open-webui");
    assert_eq!(settings.service_url, "http://localhost:3000");
    assert_eq!(settings.docs_url, "https://docs.openwebui.com/");
}

#[test]
fn test_shutdown_policy_follows_settings() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"stop_attempts": 2, "stop_poll_interval_ms": 250}}"#).unwrap();

    let settings = SettingsManager::load_from_file(file.path()).unwrap();
    let policy = ShutdownPolicy::from_settings(&settings);
    assert_eq!(policy.attempts, 2);
    assert_eq!(policy.interval, Duration::from_millis(250));
    assert_eq!(policy.grace_period(), Duration::from_millis(500));
}

#[test]
fn test_unknown_keys_are_ignored() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"ollama_command": "ollama", "max_log_lines": 100}}"#).unwrap();

    let settings = SettingsManager::load_from_file(file.path()).unwrap();
    assert_eq!(settings.max_log_lines, 100);
    assert_eq!(settings.command, "open-webui");
}

#[test]
fn test_wrong_types_fall_back_to_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"stop_attempts": "five"}}"#).unwrap();

    assert!(matches!(
        SettingsManager::load_from_file(file.path()),
        Err(ConfigError::InvalidJson(_))
    ));
    assert_eq!(
        SettingsManager::load_or_default(file.path()),
        ControllerSettings::default()
    );
}

#[test]
fn test_settings_round_trip_through_json() {
    let settings = ControllerSettings {
        command: "/usr/local/bin/open-webui".to_string(),
        log_file: Some("/tmp/webui-controller.log".into()),
        ..Default::default()
    };
    let json = serde_json::to_string_pretty(&settings).unwrap();
    let parsed: ControllerSettings = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, settings);
    assert!(parsed.validate().is_ok());
}
