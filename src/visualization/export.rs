//! Raster canvas and PNG export.
//!
//! The renderer draws into an in-memory RGB buffer. Exporting optionally crops
//! that buffer to the bounding box of everything that differs from the
//! background (plus a small padding) and writes a PNG whose physical pixel
//! density records the requested DPI.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use image::{imageops, RgbImage};
use png::{BitDepth, ColorType, Encoder, PixelDimensions, Unit};
use thiserror::Error;

/// Background color the renderer fills canvases with.
pub const BACKGROUND: [u8; 3] = [255, 255, 255];

/// Padding kept around the drawn content when cropping, in inches.
const TIGHT_PAD_IN: f64 = 0.1;

const METERS_PER_INCH: f64 = 0.0254;

/// Errors that can occur while exporting a canvas.
#[derive(Error, Debug)]
pub enum ExportError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create the output file.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PNG encoding failed.
    #[error("failed to encode PNG '{path}': {source}")]
    Encode {
        path: String,
        #[source]
        source: png::EncodingError,
    },

    #[error("pixel buffer holds {found} bytes, expected {expected}")]
    BufferSize { expected: usize, found: usize },
}

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Rendered RGB image.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbImage,
}

impl Canvas {
    /// Wraps a tightly packed RGB buffer of `width × height` pixels.
    pub fn from_rgb(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        let found = pixels.len();
        RgbImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or(ExportError::BufferSize { expected, found })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// RGB value at (`x`, `y`).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.image.get_pixel(x, y).0
    }

    /// Number of pixels matching `predicate`.
    pub fn count_pixels<F>(&self, predicate: F) -> usize
    where
        F: Fn([u8; 3]) -> bool,
    {
        self.image.pixels().filter(|p| predicate(p.0)).count()
    }

    /// Bounding box `(x, y, width, height)` of non-background pixels.
    pub fn content_bounds(&self) -> Option<(u32, u32, u32, u32)> {
        let mut x0 = u32::MAX;
        let mut y0 = u32::MAX;
        let mut x1 = 0;
        let mut y1 = 0;
        let mut found = false;

        for (x, y, p) in self.image.enumerate_pixels() {
            if p.0 != BACKGROUND {
                found = true;
                x0 = x0.min(x);
                y0 = y0.min(y);
                x1 = x1.max(x);
                y1 = y1.max(y);
            }
        }

        found.then(|| (x0, y0, x1 - x0 + 1, y1 - y0 + 1))
    }

    /// Crop to the drawn content with `pad` pixels of margin.
    ///
    /// A canvas with nothing drawn is returned unchanged.
    pub fn cropped(&self, pad: u32) -> Canvas {
        let Some((x, y, w, h)) = self.content_bounds() else {
            return self.clone();
        };
        let left = x.saturating_sub(pad);
        let top = y.saturating_sub(pad);
        let right = (x + w + pad).min(self.width());
        let bottom = (y + h + pad).min(self.height());

        let image = imageops::crop_imm(&self.image, left, top, right - left, bottom - top).to_image();
        Canvas { image }
    }

    /// Write the canvas as PNG.
    ///
    /// # Arguments
    ///
    /// * `path` - Output file path (parent directories will be created if needed)
    /// * `dpi` - Pixel density recorded in the file
    /// * `tight` - Crop to the drawn content first
    ///
    /// Existing files are overwritten.
    pub fn save_png(&self, path: &Path, dpi: u32, tight: bool) -> Result<()> {
        let canvas = if tight {
            self.cropped((TIGHT_PAD_IN * dpi as f64).round() as u32)
        } else {
            self.clone()
        };

        ensure_parent_dirs(path)?;
        let file = File::create(path).map_err(|e| ExportError::CreateFile {
            path: path.display().to_string(),
            source: e,
        })?;

        let path_str = path.display().to_string();
        let encode_err = |e| ExportError::Encode {
            path: path_str.clone(),
            source: e,
        };

        let mut encoder = Encoder::new(BufWriter::new(file), canvas.width(), canvas.height());
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        let ppu = dpi_to_pixels_per_meter(dpi);
        encoder.set_pixel_dims(Some(PixelDimensions {
            xppu: ppu,
            yppu: ppu,
            unit: Unit::Meter,
        }));

        let mut writer = encoder.write_header().map_err(encode_err)?;
        writer
            .write_image_data(canvas.image.as_raw())
            .map_err(encode_err)?;
        writer.finish().map_err(encode_err)?;

        log::info!(
            "Saved {}x{} figure -> {}",
            canvas.width(),
            canvas.height(),
            path.display()
        );
        Ok(())
    }
}

/// PNG stores density in pixels per meter.
pub fn dpi_to_pixels_per_meter(dpi: u32) -> u32 {
    (dpi as f64 / METERS_PER_INCH).round() as u32
}

fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ExportError::CreateDirectory {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
    }
    Ok(())
}
