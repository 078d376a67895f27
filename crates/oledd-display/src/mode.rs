//! Display modes and the concrete screens they resolve to

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown {kind}: {name}")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

/// Operator-selected display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Cycle through the rotation list
    Auto,
    /// Operator text message
    Manual,
    System,
    Network,
    /// Key/value data received over the bus
    Custom,
    Qr,
    /// Panel powered down, nothing drawn
    Off,
}

impl Mode {
    pub const ALL: [Mode; 7] = [
        Mode::Auto,
        Mode::Manual,
        Mode::System,
        Mode::Network,
        Mode::Custom,
        Mode::Qr,
        Mode::Off,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Auto => "auto",
            Mode::Manual => "manual",
            Mode::System => "system",
            Mode::Network => "network",
            Mode::Custom => "custom",
            Mode::Qr => "qr",
            Mode::Off => "off",
        }
    }

    /// Screen drawn in this mode, `None` for auto
    pub fn fixed_screen(&self) -> Option<Screen> {
        match self {
            Mode::Auto => None,
            Mode::Manual => Some(Screen::Manual),
            Mode::System => Some(Screen::System),
            Mode::Network => Some(Screen::Network),
            Mode::Custom => Some(Screen::Custom),
            Mode::Qr => Some(Screen::Qr),
            Mode::Off => Some(Screen::Off),
        }
    }
}

impl FromStr for Mode {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Mode::Auto),
            "manual" | "text" => Ok(Mode::Manual),
            "system" => Ok(Mode::System),
            "network" => Ok(Mode::Network),
            "custom" | "sensors" => Ok(Mode::Custom),
            "qr" => Ok(Mode::Qr),
            "off" => Ok(Mode::Off),
            _ => Err(UnknownName {
                kind: "mode",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concrete screen drawn on one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Screen {
    System,
    Network,
    Custom,
    Qr,
    Manual,
    Off,
}

impl Screen {
    pub fn as_str(&self) -> &'static str {
        match self {
            Screen::System => "system",
            Screen::Network => "network",
            Screen::Custom => "custom",
            Screen::Qr => "qr",
            Screen::Manual => "manual",
            Screen::Off => "off",
        }
    }

    /// Parse a rotation entry; `off` cannot be rotated through
    pub fn from_rotation_name(name: &str) -> Result<Self, UnknownName> {
        match Mode::from_str(name)?.fixed_screen() {
            Some(screen) if screen != Screen::Off => Ok(screen),
            _ => Err(UnknownName {
                kind: "rotation screen",
                name: name.to_string(),
            }),
        }
    }

    /// Parse a whole rotation list
    pub fn parse_rotation<S: AsRef<str>>(names: &[S]) -> Result<Vec<Screen>, UnknownName> {
        names
            .iter()
            .map(|n| Screen::from_rotation_name(n.as_ref()))
            .collect()
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
