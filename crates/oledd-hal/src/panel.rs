//! Panel contract
//!
//! Handles contrast, power, clear and frame commit for the physical display.

use crate::Canvas;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Failed to open I2C bus {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("Panel initialization failed: {0}")]
    InitializationFailed(String),

    #[error("Unsupported panel: {0}")]
    Unsupported(String),

    #[error("Panel write failed: {0}")]
    Write(String),

    #[error("Frame is {frame_width}x{frame_height}, panel is {width}x{height}")]
    FrameSize {
        frame_width: u32,
        frame_height: u32,
        width: u32,
        height: u32,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Panel configuration
#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub i2c_bus: PathBuf,
    pub address: u8,
    pub width: u32,
    pub height: u32,
    pub contrast: u8,
}

impl PanelConfig {
    /// Device node for an I2C bus number
    pub fn bus_path(port: u8) -> PathBuf {
        PathBuf::from(format!("/dev/i2c-{}", port))
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            i2c_bus: Self::bus_path(1),
            address: 0x3C,
            width: 128,
            height: 64,
            contrast: 255,
        }
    }
}

/// Supported panel controllers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Ssd1306,
    Sh1106,
}

impl PanelKind {
    /// Controller for a configured display type, case-insensitive
    pub fn from_name(name: &str) -> Result<Self, PanelError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "ssd1306" => Ok(PanelKind::Ssd1306),
            "sh1106" => Ok(PanelKind::Sh1106),
            other => Err(PanelError::Unsupported(format!("display type {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PanelKind::Ssd1306 => "SSD1306",
            PanelKind::Sh1106 => "SH1106",
        }
    }
}

/// Hardware sink for rendered frames
///
/// Implementations own the bus. Every method is a blocking I2C transaction,
/// so callers must not hold shared locks across them.
pub trait Panel: Send {
    /// Panel resolution as (width, height)
    fn size(&self) -> (u32, u32);

    /// Set contrast (0-255)
    fn set_contrast(&mut self, level: u8) -> Result<(), PanelError>;

    /// Wake the panel
    fn power_on(&mut self) -> Result<(), PanelError>;

    /// Put the panel to sleep, content is retained by the controller
    fn power_off(&mut self) -> Result<(), PanelError>;

    /// Blank the panel
    fn clear(&mut self) -> Result<(), PanelError>;

    /// Commit a frame
    fn flush(&mut self, frame: &Canvas) -> Result<(), PanelError>;
}

impl<P: Panel + ?Sized> Panel for Box<P> {
    fn size(&self) -> (u32, u32) {
        (**self).size()
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), PanelError> {
        (**self).set_contrast(level)
    }

    fn power_on(&mut self) -> Result<(), PanelError> {
        (**self).power_on()
    }

    fn power_off(&mut self) -> Result<(), PanelError> {
        (**self).power_off()
    }

    fn clear(&mut self) -> Result<(), PanelError> {
        (**self).clear()
    }

    fn flush(&mut self, frame: &Canvas) -> Result<(), PanelError> {
        (**self).flush(frame)
    }
}

/// Reject frames whose geometry differs from the panel
pub(crate) fn check_frame(frame: &Canvas, width: u32, height: u32) -> Result<(), PanelError> {
    if frame.width() != width || frame.height() != height {
        return Err(PanelError::FrameSize {
            frame_width: frame.width(),
            frame_height: frame.height(),
            width,
            height,
        });
    }
    Ok(())
}
