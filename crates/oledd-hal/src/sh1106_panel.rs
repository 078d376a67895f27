//! SH1106 over Linux I2C
//!
//! The SH1106 has a 132 column RAM; the `sh1106` crate handles the column
//! offset, so frames are committed the same way as on the SSD1306.

use crate::panel::check_frame;
use crate::{Canvas, Panel, PanelConfig, PanelError};
use linux_embedded_hal::I2cdev;
use sh1106::{Builder, interface::I2cInterface, mode::GraphicsMode, prelude::*};

/// SH1106 panel
pub struct Sh1106Panel {
    driver: GraphicsMode<I2cInterface<I2cdev>>,
    config: PanelConfig,
}

impl Sh1106Panel {
    /// Open the bus, initialize the controller and blank it
    pub fn open(config: PanelConfig) -> Result<Self, PanelError> {
        if (config.width, config.height) != (128, 64) {
            return Err(PanelError::Unsupported(format!(
                "SH1106 {}x{}",
                config.width, config.height
            )));
        }

        let i2c = I2cdev::new(&config.i2c_bus).map_err(|e| PanelError::Open {
            path: config.i2c_bus.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut driver: GraphicsMode<_> = Builder::new()
            .with_size(DisplaySize::Display128x64)
            .with_i2c_addr(config.address)
            .connect_i2c(i2c)
            .into();
        driver
            .init()
            .map_err(|e| PanelError::InitializationFailed(format!("{:?}", e)))?;
        driver.clear();
        driver.flush().map_err(write_error)?;

        let mut panel = Self { driver, config };
        let contrast = panel.config.contrast;
        panel.set_contrast(contrast)?;

        tracing::info!(
            "SH1106 {}x{} initialized on {} at 0x{:02X}",
            panel.config.width,
            panel.config.height,
            panel.config.i2c_bus.display(),
            panel.config.address
        );

        Ok(panel)
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }
}

fn write_error<E: std::fmt::Debug>(e: E) -> PanelError {
    PanelError::Write(format!("{:?}", e))
}

impl Panel for Sh1106Panel {
    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), PanelError> {
        self.driver.set_contrast(level).map_err(write_error)?;
        self.config.contrast = level;
        tracing::debug!("Contrast set to {}", level);
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), PanelError> {
        self.driver.display_on(true).map_err(write_error)?;
        tracing::debug!("Panel powered on");
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), PanelError> {
        self.driver.display_on(false).map_err(write_error)?;
        tracing::debug!("Panel powered off");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PanelError> {
        self.driver.clear();
        self.driver.flush().map_err(write_error)
    }

    fn flush(&mut self, frame: &Canvas) -> Result<(), PanelError> {
        check_frame(frame, self.config.width, self.config.height)?;

        self.driver.clear();
        for (x, y) in frame.lit() {
            self.driver.set_pixel(x, y, 1);
        }
        self.driver.flush().map_err(write_error)
    }
}
