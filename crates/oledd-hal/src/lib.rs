//! Panel Abstraction Layer
//!
//! This crate provides the hardware side of oledd: the [`Panel`] contract that
//! the render loop drives, the in-memory [`Canvas`] every frame is painted on,
//! and the concrete backends.
//!
//! # Backends
//!
//! - SSD1306 128x64 over Linux I2C (`/dev/i2c-N`), see [`Ssd1306Panel`]
//! - SH1106 128x64 over Linux I2C, see [`Sh1106Panel`]
//! - [`mock::MockPanel`] for tests and dry runs on development hosts
//!
//! # Example
//!
//! ```no_run
//! use oledd_hal::{Canvas, Panel, PanelConfig};
//! use oledd_hal::mock::MockPanel;
//!
//! fn main() -> Result<(), oledd_hal::PanelError> {
//!     let config = PanelConfig::default();
//!     let mut panel = MockPanel::new(config.width, config.height);
//!
//!     let canvas = Canvas::new(config.width, config.height);
//!     panel.set_contrast(config.contrast)?;
//!     panel.flush(&canvas)?;
//!     Ok(())
//! }
//! ```

pub mod canvas;
pub mod mock;
pub mod panel;

#[cfg(target_os = "linux")]
mod sh1106_panel;
#[cfg(target_os = "linux")]
mod ssd1306_panel;

pub use canvas::Canvas;
pub use panel::{Panel, PanelConfig, PanelError, PanelKind};

#[cfg(target_os = "linux")]
pub use sh1106_panel::Sh1106Panel;
#[cfg(target_os = "linux")]
pub use ssd1306_panel::Ssd1306Panel;

/// HAL Result type
pub type Result<T> = std::result::Result<T, PanelError>;
