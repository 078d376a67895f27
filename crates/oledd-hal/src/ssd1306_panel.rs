//! SSD1306 over Linux I2C
//!
//! Drives a 128x64 SSD1306 controller through `/dev/i2c-N` using the
//! buffered graphics mode of the `ssd1306` crate.

use crate::panel::check_frame;
use crate::{Canvas, Panel, PanelConfig, PanelError};
use linux_embedded_hal::I2cdev;
use ssd1306::{I2CDisplayInterface, Ssd1306, mode::BufferedGraphicsMode, prelude::*};

type Driver = Ssd1306<
    I2CInterface<I2cdev>,
    DisplaySize128x64,
    BufferedGraphicsMode<DisplaySize128x64>,
>;

/// Precharge period used for every contrast level (controller reset value)
const PRECHARGE: u8 = 0x2;

/// SSD1306 panel
pub struct Ssd1306Panel {
    driver: Driver,
    config: PanelConfig,
}

impl Ssd1306Panel {
    /// Open the bus, initialize the controller and blank it
    pub fn open(config: PanelConfig) -> Result<Self, PanelError> {
        if (config.width, config.height) != (128, 64) {
            return Err(PanelError::Unsupported(format!(
                "SSD1306 {}x{}",
                config.width, config.height
            )));
        }

        let i2c = I2cdev::new(&config.i2c_bus).map_err(|e| PanelError::Open {
            path: config.i2c_bus.display().to_string(),
            reason: e.to_string(),
        })?;
        let interface = I2CDisplayInterface::new_custom_address(i2c, config.address);

        let mut driver = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        driver
            .init()
            .map_err(|e| PanelError::InitializationFailed(format!("{:?}", e)))?;
        driver.clear_buffer();
        driver.flush().map_err(write_error)?;

        let mut panel = Self { driver, config };
        let contrast = panel.config.contrast;
        panel.set_contrast(contrast)?;

        tracing::info!(
            "SSD1306 {}x{} initialized on {} at 0x{:02X}",
            panel.config.width,
            panel.config.height,
            panel.config.i2c_bus.display(),
            panel.config.address
        );

        Ok(panel)
    }

    /// Get panel configuration
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }
}

fn write_error<E: std::fmt::Debug>(e: E) -> PanelError {
    PanelError::Write(format!("{:?}", e))
}

impl Panel for Ssd1306Panel {
    fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    fn set_contrast(&mut self, level: u8) -> Result<(), PanelError> {
        self.driver
            .set_brightness(Brightness::custom(PRECHARGE, level))
            .map_err(write_error)?;
        self.config.contrast = level;
        tracing::debug!("Contrast set to {}", level);
        Ok(())
    }

    fn power_on(&mut self) -> Result<(), PanelError> {
        self.driver.set_display_on(true).map_err(write_error)?;
        tracing::debug!("Panel powered on");
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), PanelError> {
        self.driver.set_display_on(false).map_err(write_error)?;
        tracing::debug!("Panel powered off");
        Ok(())
    }

    fn clear(&mut self) -> Result<(), PanelError> {
        self.driver.clear_buffer();
        self.driver.flush().map_err(write_error)
    }

    fn flush(&mut self, frame: &Canvas) -> Result<(), PanelError> {
        check_frame(frame, self.config.width, self.config.height)?;

        self.driver.clear_buffer();
        for (x, y) in frame.lit() {
            self.driver.set_pixel(x, y, true);
        }
        self.driver.flush().map_err(write_error)
    }
}
