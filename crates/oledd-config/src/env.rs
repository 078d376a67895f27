//! Environment variable overrides
//!
//! Container deployments configure the daemon through environment variables
//! rather than a file. Each recognised variable replaces one field.

use crate::{ConfigError, DaemonConfig};
use std::str::FromStr;

/// Apply overrides from a variable lookup function
///
/// Taking the lookup as a closure keeps this testable without touching the
/// process environment.
pub fn apply_overrides<F>(config: &mut DaemonConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mqtt = &mut config.mqtt;
    set_string(&lookup, "MQTT_BROKER", &mut mqtt.broker);
    set_parsed(&lookup, "MQTT_PORT", &mut mqtt.port)?;
    set_string(&lookup, "MQTT_USER", &mut mqtt.user);
    set_string(&lookup, "MQTT_PASSWORD", &mut mqtt.password);
    set_string(&lookup, "MQTT_TOPIC_TEXT", &mut mqtt.topics.text);
    set_string(&lookup, "MQTT_TOPIC_COMMAND", &mut mqtt.topics.command);
    set_string(&lookup, "MQTT_TOPIC_MODE", &mut mqtt.topics.mode);
    set_string(&lookup, "MQTT_TOPIC_BRIGHTNESS", &mut mqtt.topics.brightness);
    set_string(&lookup, "MQTT_TOPIC_REFRESH", &mut mqtt.topics.refresh);

    let display = &mut config.display;
    if let Some(value) = lookup("I2C_ADDRESS") {
        display.i2c_address = parse_hex_u8(&value)
            .ok_or_else(|| ConfigError::Invalid(format!("I2C_ADDRESS={}", value)))?;
    }
    set_parsed(&lookup, "I2C_PORT", &mut display.i2c_port)?;
    set_parsed(&lookup, "DISPLAY_WIDTH", &mut display.width)?;
    set_parsed(&lookup, "DISPLAY_HEIGHT", &mut display.height)?;
    set_string(&lookup, "DISPLAY_TYPE", &mut display.display_type);
    set_parsed(&lookup, "DEFAULT_BRIGHTNESS", &mut display.brightness)?;

    set_parsed(
        &lookup,
        "REFRESH_INTERVAL",
        &mut config.schedule.rotation_interval_secs,
    )?;
    set_string(&lookup, "QR_LINK", &mut config.qr.link);

    Ok(())
}

fn set_string<F>(lookup: &F, name: &str, field: &mut String)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(name) {
        tracing::debug!("{} overridden from environment", name);
        *field = value;
    }
}

fn set_parsed<F, T>(lookup: &F, name: &str, field: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(name) {
        *field = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("{}={}", name, value)))?;
        tracing::debug!("{} overridden from environment", name);
    }
    Ok(())
}

/// Parse `0x3C`, `0X3c` or `3C`
pub fn parse_hex_u8(value: &str) -> Option<u8> {
    let value = value.trim();
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u8::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_parse_hex_u8() {
        assert_eq!(parse_hex_u8("0x3C"), Some(0x3C));
        assert_eq!(parse_hex_u8("0X3d"), Some(0x3D));
        assert_eq!(parse_hex_u8("3c"), Some(0x3C));
        assert_eq!(parse_hex_u8("0x1FF"), None);
        assert_eq!(parse_hex_u8("zz"), None);
    }

    #[test]
    fn test_overrides_applied() {
        let mut config = DaemonConfig::default();
        let lookup = lookup_from(&[
            ("MQTT_BROKER", "broker.lan"),
            ("MQTT_PORT", "8883"),
            ("MQTT_TOPIC_MODE", "oled/mode"),
            ("I2C_ADDRESS", "0x3D"),
            ("REFRESH_INTERVAL", "12"),
            ("DEFAULT_BRIGHTNESS", "40"),
            ("QR_LINK", "https://example.org"),
        ]);

        apply_overrides(&mut config, lookup).unwrap();

        assert_eq!(config.mqtt.broker, "broker.lan");
        assert_eq!(config.mqtt.port, 8883);
        assert_eq!(config.mqtt.topics.mode, "oled/mode");
        assert_eq!(config.display.i2c_address, 0x3D);
        assert_eq!(config.schedule.rotation_interval_secs, 12);
        assert_eq!(config.display.brightness, 40);
        assert_eq!(config.qr.link, "https://example.org");
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let mut config = DaemonConfig::default();
        apply_overrides(&mut config, |_| None).unwrap();
        assert_eq!(config.mqtt.broker, "core-mqtt");
        assert_eq!(config.display.i2c_port, 1);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let mut config = DaemonConfig::default();
        let err = apply_overrides(&mut config, lookup_from(&[("MQTT_PORT", "abc")])).unwrap_err();
        assert!(format!("{}", err).contains("MQTT_PORT"));

        let err =
            apply_overrides(&mut config, lookup_from(&[("DEFAULT_BRIGHTNESS", "999")])).unwrap_err();
        assert!(format!("{}", err).contains("DEFAULT_BRIGHTNESS"));
    }
}
