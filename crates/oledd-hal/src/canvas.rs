//! In-memory drawing surface
//!
//! One frame's pixels before they are committed to the panel. Renderers draw
//! on a [`Canvas`] through `embedded-graphics`; the panel backend copies the
//! lit pixels into its own buffer on flush.

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};
use std::convert::Infallible;

/// Monochrome frame buffer, one `bool` per pixel, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Canvas {
    /// Create a blank canvas
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![false; (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Turn every pixel off
    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Read a pixel; out-of-bounds coordinates read as off
    pub fn pixel(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.pixels[(y * self.width + x) as usize]
    }

    /// Write a pixel; out-of-bounds coordinates are clipped
    pub fn set_pixel(&mut self, x: u32, y: u32, on: bool) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = on;
        }
    }

    /// Number of lit pixels
    pub fn lit_pixels(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }

    /// Number of lit pixels inside a horizontal band `[y_start, y_end)`
    pub fn lit_pixels_in_rows(&self, y_start: u32, y_end: u32) -> usize {
        let y_end = y_end.min(self.height);
        (y_start..y_end)
            .map(|y| (0..self.width).filter(|&x| self.pixel(x, y)).count())
            .sum()
    }

    pub fn is_blank(&self) -> bool {
        !self.pixels.iter().any(|&p| p)
    }

    /// Iterate the coordinates of lit pixels
    pub fn lit(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = self.width;
        self.pixels
            .iter()
            .enumerate()
            .filter(|(_, on)| **on)
            .map(move |(i, _)| (i as u32 % width, i as u32 / width))
    }
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

impl DrawTarget for Canvas {
    type Color = BinaryColor;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 {
                continue;
            }
            self.set_pixel(point.x as u32, point.y as u32, color.is_on());
        }
        Ok(())
    }
}
