// THEORY:
// The `PixelBuffer` is the unit of analysis for every color measurement in the crate.
// It plays the role a canvas plays in a browser: an image or video frame is drawn
// into a flat RGBA byte grid, the grid is sampled, and the grid is thrown away.
//
// Key architectural principles:
// 1.  **Flat RGBA layout**: Four bytes per pixel, row-major, no padding. This is the
//     layout `image::RgbaImage` already uses, so converting a decoded image is a move
//     rather than a copy.
// 2.  **Strided sampling**: Aggregate metrics never look at every pixel. They read
//     every fourth pixel (a 16-byte stride), which is plenty for averages over a face
//     crop and keeps the cost flat regardless of camera resolution. The first pixel is
//     always sampled, so even a buffer smaller than the stride yields a sample.
// 3.  **Sub-regions**: Crops are cut either by an absolute rectangle (the detected
//     face box) or by fixed fractions of the canvas (lips, eyes, cheeks). Both clamp
//     to the buffer, so a box that spills past the edge is trimmed, not rejected.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::{Result, VisionError};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};

/// Sample every Nth pixel when aggregating.
pub const SAMPLE_STRIDE_PIXELS: usize = 4;

/// An axis-aligned rectangle in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Trims the rectangle so it lies inside a `width` x `height` grid.
    pub fn clamp_to(&self, width: u32, height: u32) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Rect {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }
}

/// A sub-rectangle expressed as fractions of the canvas size: origin plus extent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionFractions {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RegionFractions {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolves the fractions against a concrete canvas. Coordinates are floored and
    /// extents are never smaller than one pixel.
    pub fn to_rect(&self, width: u32, height: u32) -> Rect {
        let x = (width as f64 * self.x).floor() as u32;
        let y = (height as f64 * self.y).floor() as u32;
        let region_width = (width as f64 * self.width).floor() as u32;
        let region_height = (height as f64 * self.height).floor() as u32;
        Rect::new(x, y, region_width.max(1), region_height.max(1)).clamp_to(width, height)
    }
}

/// A rectangular grid of RGBA samples.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps raw RGBA bytes. The length must be exactly `width * height * 4`.
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(VisionError::InvalidInput(format!(
                "pixel buffer of {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer filled with a single color.
    pub fn filled(width: u32, height: u32, pixel: Pixel) -> Self {
        let bytes: [u8; CHANNELS] = pixel.into();
        let data = bytes.repeat(width as usize * height as usize);
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_image(image: &DynamicImage) -> Self {
        Self::from(image.to_rgba8())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len() / CHANNELS
    }

    /// Every `SAMPLE_STRIDE_PIXELS`th pixel, starting with the first.
    pub fn sampled_pixels(&self) -> impl Iterator<Item = Pixel> + '_ {
        self.data
            .chunks_exact(CHANNELS)
            .step_by(SAMPLE_STRIDE_PIXELS)
            .map(|bytes| Pixel::new(bytes[0], bytes[1], bytes[2], bytes[3]))
    }

    /// Copies the pixels under `rect` (clamped to this buffer) into a fresh buffer.
    pub fn crop(&self, rect: Rect) -> PixelBuffer {
        let rect = rect.clamp_to(self.width, self.height);
        let row_bytes = rect.width as usize * CHANNELS;
        let mut data = Vec::with_capacity(row_bytes * rect.height as usize);

        for row in rect.y..rect.y + rect.height {
            let start = (row as usize * self.width as usize + rect.x as usize) * CHANNELS;
            data.extend_from_slice(&self.data[start..start + row_bytes]);
        }

        PixelBuffer {
            width: rect.width,
            height: rect.height,
            data,
        }
    }

    pub fn region(&self, fractions: &RegionFractions) -> PixelBuffer {
        self.crop(fractions.to_rect(self.width, self.height))
    }

    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }
}
