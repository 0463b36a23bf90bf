//! Configuration module for the controller.
//!
//! `ControllerSettings` carries every tunable the controller uses: the managed
//! command, the installer command, link targets, timer cadences and the
//! graceful-stop policy. Defaults reproduce the stock OpenWebUI setup, so the
//! settings file is entirely optional.
//!
//! # Settings Location
//!
//! `SettingsManager` looks for `settings.json` at:
//! - `$WEBUI_CONTROLLER_SETTINGS`, if set
//! - `<config dir>/webui-controller/settings.json` otherwise
//!
//! The file is read-only from the controller's point of view: nothing is ever
//! written back.

use crate::error::ConfigError;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the settings file location
pub const SETTINGS_ENV_VAR: &str = "WEBUI_CONTROLLER_SETTINGS";

/// Controller settings, deserialized from `settings.json`
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    // Managed service
    pub command: String,
    pub serve_argument: String,
    pub install_command: String,

    // Links
    pub docs_url: String,
    pub service_url: String,

    // Timer cadences (milliseconds)
    pub resource_interval_ms: u64,
    pub drain_interval_ms: u64,
    pub command_check_interval_ms: u64,
    pub recheck_debounce_ms: u64,
    pub gpu_refresh_interval_ms: u64,

    // Graceful stop policy
    pub stop_attempts: u32,
    pub stop_poll_interval_ms: u64,

    // Log view and diagnostics
    pub max_log_lines: usize,
    pub log_level: String,
    /// Optional file that diagnostic logs are appended to
    pub log_file: Option<PathBuf>,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        ControllerSettings {
            command: "open-webui".to_string(),
            serve_argument: "serve".to_string(),
            install_command: "pip install open-webui".to_string(),
            docs_url: "https://docs.openwebui.com/".to_string(),
            service_url: "http://localhost:8080".to_string(),
            resource_interval_ms: 1000,
            drain_interval_ms: 100,
            command_check_interval_ms: 5000,
            recheck_debounce_ms: 500,
            gpu_refresh_interval_ms: 2000,
            stop_attempts: 5,
            stop_poll_interval_ms: 500,
            max_log_lines: 5000,
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl ControllerSettings {
    pub fn resource_interval(&self) -> Duration {
        Duration::from_millis(self.resource_interval_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }

    pub fn command_check_interval(&self) -> Duration {
        Duration::from_millis(self.command_check_interval_ms)
    }

    pub fn recheck_debounce(&self) -> Duration {
        Duration::from_millis(self.recheck_debounce_ms)
    }

    pub fn gpu_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.gpu_refresh_interval_ms)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    /// Parse `log_level` into a filter, falling back to `Info`
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level
            .parse::<log::LevelFilter>()
            .unwrap_or(log::LevelFilter::Info)
    }

    /// Check settings for values the controller cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("command is empty".to_string()));
        }
        if self.serve_argument.trim().is_empty() {
            return Err(ConfigError::ValidationFailed("serve_argument is empty".to_string()));
        }
        if self.stop_attempts == 0 {
            return Err(ConfigError::ValidationFailed("stop_attempts must be at least 1".to_string()));
        }
        let intervals = [
            ("resource_interval_ms", self.resource_interval_ms),
            ("drain_interval_ms", self.drain_interval_ms),
            ("command_check_interval_ms", self.command_check_interval_ms),
            ("gpu_refresh_interval_ms", self.gpu_refresh_interval_ms),
            ("stop_poll_interval_ms", self.stop_poll_interval_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ValidationFailed(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }

    /// Reset unusable values to their defaults instead of refusing to start
    pub fn sanitize(mut self) -> Self {
        let defaults = ControllerSettings::default();

        if self.command.trim().is_empty() {
            log::warn!("[Config] Empty command, resetting to '{}'", defaults.command);
            self.command = defaults.command;
        }
        if self.serve_argument.trim().is_empty() {
            self.serve_argument = defaults.serve_argument;
        }
        if self.install_command.trim().is_empty() {
            self.install_command = defaults.install_command;
        }
        if self.stop_attempts == 0 {
            self.stop_attempts = defaults.stop_attempts;
        }
        if self.max_log_lines == 0 {
            self.max_log_lines = defaults.max_log_lines;
        }

        let reset = |name: &str, value: &mut u64, default: u64| {
            if *value == 0 {
                log::warn!("[Config] {} is zero, resetting to {}", name, default);
                *value = default;
            }
        };
        reset("resource_interval_ms", &mut self.resource_interval_ms, defaults.resource_interval_ms);
        reset("drain_interval_ms", &mut self.drain_interval_ms, defaults.drain_interval_ms);
        reset(
            "command_check_interval_ms",
            &mut self.command_check_interval_ms,
            defaults.command_check_interval_ms,
        );
        reset("gpu_refresh_interval_ms", &mut self.gpu_refresh_interval_ms, defaults.gpu_refresh_interval_ms);
        reset("stop_poll_interval_ms", &mut self.stop_poll_interval_ms, defaults.stop_poll_interval_ms);

        self
    }
}

/// Read-only loader for `ControllerSettings`
pub struct SettingsManager;

impl SettingsManager {
    /// Resolve the settings path: env override first, then the user config dir
    pub fn settings_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(SETTINGS_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        dirs::config_dir().map(|dir| dir.join("webui-controller").join("settings.json"))
    }

    /// Load settings from the default location, or return defaults.
    ///
    /// A missing file is the normal case. A malformed file is reported and
    /// ignored rather than preventing the panel from starting.
    pub fn load() -> ControllerSettings {
        match Self::settings_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                log::debug!("[Config] No config directory available, using defaults");
                ControllerSettings::default()
            }
        }
    }

    /// Load settings from `path`, falling back to defaults on any failure
    pub fn load_or_default(path: &Path) -> ControllerSettings {
        match Self::load_from_file(path) {
            Ok(settings) => {
                log::info!("[Config] Loaded settings from {}", path.display());
                settings
            }
            Err(ConfigError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[Config] No settings file at {}, using defaults", path.display());
                ControllerSettings::default()
            }
            Err(e) => {
                log::warn!("[Config] Failed to load {}, falling back to defaults: {}", path.display(), e);
                ControllerSettings::default()
            }
        }
    }

    /// Strictly load and sanitize settings from a JSON file
    pub fn load_from_file(path: &Path) -> Result<ControllerSettings, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let settings: ControllerSettings = serde_json::from_str(&content)?;
        Ok(settings.sanitize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_stock_setup() {
        let settings = ControllerSettings::default();
        assert_eq!(settings.command, "open-webui");
        assert_eq!(settings.serve_argument, "serve");
        assert_eq!(settings.install_command, "pip install open-webui");
        assert_eq!(settings.service_url, "http://localhost:8080");
        assert_eq!(settings.stop_attempts, 5);
        assert_eq!(settings.stop_poll_interval(), Duration::from_millis(500));
        assert_eq!(settings.drain_interval(), Duration::from_millis(100));
        assert_eq!(settings.resource_interval(), Duration::from_millis(1000));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"command": "/opt/webui/bin/open-webui", "stop_attempts": 3}}"#).unwrap();

        let settings = SettingsManager::load_from_file(file.path()).unwrap();
        assert_eq!(settings.command, "/opt/webui/bin/open-webui");
        assert_eq!(settings.stop_attempts, 3);
        assert_eq!(settings.drain_interval_ms, 100);
    }

    #[test]
    fn test_zero_values_are_sanitized() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"drain_interval_ms": 0, "stop_attempts": 0, "command": "  "}}"#).unwrap();

        let settings = SettingsManager::load_from_file(file.path()).unwrap();
        assert_eq!(settings.drain_interval_ms, 100);
        assert_eq!(settings.stop_attempts, 5);
        assert_eq!(settings.command, "open-webui");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json at all").unwrap();

        assert!(matches!(
            SettingsManager::load_from_file(file.path()),
            Err(ConfigError::InvalidJson(_))
        ));
        assert_eq!(SettingsManager::load_or_default(file.path()), ControllerSettings::default());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SettingsManager::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(settings, ControllerSettings::default());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let settings = ControllerSettings {
            resource_interval_ms: 0,
            ..Default::default()
        };
        assert!(matches!(settings.validate(), Err(ConfigError::ValidationFailed(_))));
    }

    #[test]
    fn test_level_filter_parsing() {
        let mut settings = ControllerSettings::default();
        settings.log_level = "debug".to_string();
        assert_eq!(settings.level_filter(), log::LevelFilter::Debug);
        settings.log_level = "nonsense".to_string();
        assert_eq!(settings.level_filter(), log::LevelFilter::Info);
    }
}
