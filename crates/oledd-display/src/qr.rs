//! QR code bitmap
//!
//! The symbol is encoded once at startup and scaled by a whole number of
//! pixels per module so every module stays square on the panel.

use embedded_graphics::{
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

/// Modules of light border around the symbol
pub const QUIET_ZONE: usize = 1;

/// Pixels kept clear on each side of the scaled symbol
pub const MARGIN: u32 = 2;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR payload is empty")]
    EmptyPayload,

    #[error("QR encoding failed: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("QR symbol of {modules} modules does not fit {width}x{height}")]
    TooLarge { modules: u32, width: u32, height: u32 },
}

/// Pre-scaled, centred QR symbol
#[derive(Debug, Clone)]
pub struct QrBitmap {
    /// Side length in modules, quiet zone included
    modules: u32,
    /// Row-major, true for dark modules
    dark: Vec<bool>,
    scale: u32,
    origin: Point,
}

impl QrBitmap {
    /// Encode `payload` and lay it out for a `width` x `height` display
    pub fn new(payload: &str, width: u32, height: u32) -> Result<Self, QrError> {
        if payload.is_empty() {
            return Err(QrError::EmptyPayload);
        }

        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::L)?;
        let symbol = code.width();
        let modules = symbol + 2 * QUIET_ZONE;

        let mut dark = vec![false; modules * modules];
        for (i, color) in code.to_colors().into_iter().enumerate() {
            let (x, y) = (i % symbol + QUIET_ZONE, i / symbol + QUIET_ZONE);
            dark[y * modules + x] = color == Color::Dark;
        }

        let modules = modules as u32;
        let available = width.min(height).saturating_sub(2 * MARGIN);
        let scale = available / modules;
        if scale == 0 {
            return Err(QrError::TooLarge {
                modules,
                width,
                height,
            });
        }

        let side = modules * scale;
        let origin = Point::new(((width - side) / 2) as i32, ((height - side) / 2) as i32);

        Ok(Self {
            modules,
            dark,
            scale,
            origin,
        })
    }

    pub fn modules(&self) -> u32 {
        self.modules
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    /// Top-left corner and side length of the drawn symbol
    pub fn bounds(&self) -> Rectangle {
        let side = self.modules * self.scale;
        Rectangle::new(self.origin, Size::new(side, side))
    }

    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        x < self.modules && y < self.modules && self.dark[(y * self.modules + x) as usize]
    }

    /// Dark modules are drawn lit on an unlit background
    pub fn draw<D>(&self, target: &mut D) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = BinaryColor>,
    {
        self.bounds()
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(target)?;

        let module = Size::new(self.scale, self.scale);
        let lit = PrimitiveStyle::with_fill(BinaryColor::On);
        for y in 0..self.modules {
            for x in 0..self.modules {
                if !self.is_dark(x, y) {
                    continue;
                }
                let corner = self.origin + Point::new((x * self.scale) as i32, (y * self.scale) as i32);
                Rectangle::new(corner, module).into_styled(lit).draw(target)?;
            }
        }
        Ok(())
    }
}
