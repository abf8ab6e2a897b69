// THEORY:
// The color sampler turns a face crop into one representative skin color. It is the
// multi-pixel counterpart of `Pixel`: the same strided walk over a `PixelBuffer`
// feeds three aggregates.
//
// 1.  `sample_skin_color` keeps only pixels that pass the red-dominance skin test, so
//     hair, background and clothing inside the face box do not drag the average.
//     When nothing passes (a blue-lit room, a mask, a non-face crop) it falls back to
//     the unfiltered mean of the first `FALLBACK_SAMPLE_LIMIT` samples instead of
//     dividing by zero.
// 2.  `average_brightness` and `saturation` ignore the skin test entirely. They are
//     the "how much makeup" signals the feature analyzer reads per region.
//
// Everything here is a pure function of the buffer contents.

use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::error::{Result, VisionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

/// How many samples the unfiltered fallback averages over.
pub const FALLBACK_SAMPLE_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase, zero-padded `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinColorSample {
    pub rgb: Rgb,
    pub hex: String,
}

impl From<Rgb> for SkinColorSample {
    fn from(rgb: Rgb) -> Self {
        Self {
            hex: rgb.to_hex(),
            rgb,
        }
    }
}

#[derive(Default)]
struct ChannelSums {
    red: u64,
    green: u64,
    blue: u64,
    count: u64,
}

impl ChannelSums {
    fn add(&mut self, pixel: &Pixel) {
        self.red += pixel.red as u64;
        self.green += pixel.green as u64;
        self.blue += pixel.blue as u64;
        self.count += 1;
    }

    fn mean(&self) -> Option<Rgb> {
        if self.count == 0 {
            return None;
        }
        Some(Rgb::new(
            (self.red / self.count) as u8,
            (self.green / self.count) as u8,
            (self.blue / self.count) as u8,
        ))
    }
}

/// Averages the skin-like samples of `buffer` into a single color.
pub fn sample_skin_color(buffer: &PixelBuffer) -> Result<SkinColorSample> {
    if buffer.is_empty() {
        return Err(VisionError::EmptyInput);
    }

    let mut skin = ChannelSums::default();
    for pixel in buffer.sampled_pixels().filter(Pixel::is_skin_like) {
        skin.add(&pixel);
    }

    let rgb = match skin.mean() {
        Some(rgb) => rgb,
        None => {
            warn!(
                width = buffer.width(),
                height = buffer.height(),
                "no skin-like pixels in sample, falling back to unfiltered average"
            );
            let mut all = ChannelSums::default();
            for pixel in buffer.sampled_pixels().take(FALLBACK_SAMPLE_LIMIT) {
                all.add(&pixel);
            }
            all.mean().ok_or(VisionError::EmptyInput)?
        }
    };

    Ok(SkinColorSample::from(rgb))
}

/// Mean of `(r+g+b)/3` over the sampled pixels, `0.0` for an empty buffer.
pub fn average_brightness(buffer: &PixelBuffer) -> f32 {
    mean_of(buffer, |pixel| pixel.brightness())
}

/// Mean HSV saturation over the sampled pixels, `0.0` for an empty buffer.
pub fn saturation(buffer: &PixelBuffer) -> f32 {
    mean_of(buffer, |pixel| pixel.saturation_hsv())
}

fn mean_of(buffer: &PixelBuffer, metric: impl Fn(&Pixel) -> f32) -> f32 {
    let (total, count) = buffer
        .sampled_pixels()
        .fold((0.0f64, 0usize), |(total, count), pixel| {
            (total + metric(&pixel) as f64, count + 1)
        });
    if count == 0 {
        return 0.0;
    }
    (total / count as f64) as f32
}
