//! Configuration management for oledd
//!
//! Handles broker, panel, scheduling, telemetry and QR settings.
//! Settings come from a TOML file, then environment variable overrides.

mod env;
mod sections;

pub use env::{apply_overrides, parse_hex_u8};
pub use sections::{
    DisplayConfig, MqttConfig, QrConfig, ScheduleConfig, TelemetryConfig, TopicConfig,
};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Standard configuration path
pub const CONFIG_DIR: &str = "/etc/oledd";

/// Controller types the daemon can drive
pub const SUPPORTED_DISPLAY_TYPES: &[&str] = &["ssd1306", "sh1106"];

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub mqtt: MqttConfig,

    #[serde(default)]
    pub display: DisplayConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub qr: QrConfig,
}

impl DaemonConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default location
    pub fn load_default() -> Result<Self, ConfigError> {
        let system_config = Path::new(CONFIG_DIR).join("config.toml");
        if system_config.exists() {
            return Self::load(&system_config);
        }

        // Return default config if no file exists
        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Load from an explicit path or the default location, then apply the
    /// process environment and validate
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::load_default()?,
        };
        apply_overrides(&mut config, |name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings the daemon cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.schedule.rotation.is_empty() {
            return Err(ConfigError::Invalid("rotation list is empty".into()));
        }
        if self.schedule.rotation_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rotation_interval_secs must be positive".into(),
            ));
        }
        if self.schedule.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".into()));
        }
        let display_type = self.display.display_type.trim().to_ascii_lowercase();
        if !SUPPORTED_DISPLAY_TYPES.contains(&display_type.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unsupported display type: {}",
                self.display.display_type
            )));
        }
        if (self.display.width, self.display.height) != (128, 64) {
            return Err(ConfigError::Invalid(format!(
                "unsupported geometry {}x{}",
                self.display.width, self.display.height
            )));
        }
        if self.mqtt.broker.is_empty() {
            return Err(ConfigError::Invalid("mqtt broker is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config_is_valid() {
        let config = DaemonConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serialize_deserialize() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: DaemonConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.mqtt.broker, parsed.mqtt.broker);
        assert_eq!(config.schedule.rotation, parsed.schedule.rotation);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/oledd/config.toml"));
        assert!(format!("{}", err).contains("not found"));

        let err = ConfigError::Invalid("test error".to_string());
        assert!(format!("{}", err).contains("Invalid"));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[mqtt]
broker = "10.0.0.2"

[schedule]
rotation = ["system", "custom"]
rotation_interval_secs = 8
text_switches_mode = false

[qr]
link = "https://example.org/"
"#;
        write!(temp_file, "{}", config_content).unwrap();

        let config = DaemonConfig::load(temp_file.path()).unwrap();
        assert_eq!(config.mqtt.broker, "10.0.0.2");
        assert_eq!(config.mqtt.port, 1883);
        assert_eq!(config.schedule.rotation, vec!["system", "custom"]);
        assert_eq!(config.schedule.rotation_interval_secs, 8);
        assert!(!config.schedule.text_switches_mode);
        assert_eq!(config.schedule.tick_ms, 60);
        assert_eq!(config.qr.link, "https://example.org/");
    }

    #[test]
    fn test_load_missing_file() {
        let err = DaemonConfig::load(Path::new("/nonexistent/oledd.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_save_config() {
        let temp_file = NamedTempFile::new().unwrap();
        let mut config = DaemonConfig::default();
        config.display.brightness = 42;

        config.save(temp_file.path()).unwrap();

        let loaded = DaemonConfig::load(temp_file.path()).unwrap();
        assert_eq!(loaded.display.brightness, 42);
    }

    #[test]
    fn test_validate_rejects_bad_schedule() {
        let mut config = DaemonConfig::default();
        config.schedule.rotation.clear();
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.schedule.rotation_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.schedule.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_unsupported_panel() {
        let mut config = DaemonConfig::default();
        config.display.display_type = "ssd1322".into();
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.display.height = 32;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_sh1106() {
        let mut config = DaemonConfig::default();
        config.display.display_type = "sh1106".into();
        assert!(config.validate().is_ok());

        config.display.display_type = "SH1106".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sh1106_from_environment() {
        let mut config = DaemonConfig::default();
        apply_overrides(&mut config, |name| {
            (name == "DISPLAY_TYPE").then(|| "sh1106".to_string())
        })
        .unwrap();
        assert_eq!(config.display.display_type, "sh1106");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_constants() {
        assert_eq!(CONFIG_DIR, "/etc/oledd");
        assert_eq!(SUPPORTED_DISPLAY_TYPES, &["ssd1306", "sh1106"]);
    }
}
