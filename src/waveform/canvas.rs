//! RGBA pixel buffer the waveform is painted into.

use image::{Rgba, RgbaImage};
use std::ops::Range;
use std::path::Path;

/// A width × height grid of RGBA pixels, backed by an [`RgbaImage`].
#[derive(Debug, Clone, PartialEq)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    /// Creates a transparent canvas.
    ///
    /// # Panics
    /// If either dimension is zero.
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0 && height > 0, "canvas dimensions must be non-zero");
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn get(&self, x: u32, y: u32) -> Rgba<u8> {
        *self.image.get_pixel(x, y)
    }

    pub fn set(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        self.image.put_pixel(x, y, color);
    }

    /// Paints `rows` of column `x`; an empty range paints nothing.
    pub fn fill_column(&mut self, x: u32, rows: Range<u32>, color: Rgba<u8>) {
        for y in rows {
            self.image.put_pixel(x, y, color);
        }
    }

    /// Fills this canvas from `source` by repeating its columns
    /// (nearest neighbour). Heights must match.
    pub fn upscale_columns_from(&mut self, source: &Canvas) {
        debug_assert_eq!(self.height(), source.height());
        let (width, source_width) = (self.width() as u64, source.width() as u64);

        for x in 0..self.width() {
            let sx = (x as u64 * source_width / width) as u32;
            for y in 0..self.height() {
                self.image.put_pixel(x, y, *source.image.get_pixel(sx, y));
            }
        }
    }

    /// Writes the canvas as a PNG.
    pub fn save(&self, path: &Path) -> Result<(), image::ImageError> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
    }

    #[cfg(test)]
    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}
