// THEORY:
// The feature analyzer estimates "how much makeup" an after-photo shows. It never
// looks for the face. It assumes a roughly centered portrait and samples fixed
// fractions of the canvas as stand-ins for the lips, eyes and cheeks. Every input is
// treated the same way regardless of where the face actually sits, so the numbers are
// approximate by construction.
//
// Signals:
// - Intensity: mean HSV saturation of a region (0..1), used as a proxy for product
//   coverage. Overall intensity is the mean of lips, eyes and cheeks.
// - Color class: mean brightness of the lips and eyes bucketed into dark / medium /
//   light.
// - Feature flags: coarse tags derived from a larger central region (brightness and
//   saturation thresholds), followed by a fixed baseline of placeholder flags that
//   are always present and not actually detected.

use crate::core_modules::color_sampler::{average_brightness, saturation};
use crate::core_modules::pixel_buffer::{PixelBuffer, RegionFractions};
use crate::core_modules::tag_set::TagSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const LIPS_REGION: RegionFractions = RegionFractions::new(0.4, 0.7, 0.2, 0.1);
pub const EYES_REGION: RegionFractions = RegionFractions::new(0.3, 0.3, 0.4, 0.2);
pub const CHEEKS_REGION: RegionFractions = RegionFractions::new(0.2, 0.5, 0.6, 0.2);
pub const CENTER_REGION: RegionFractions = RegionFractions::new(0.3, 0.3, 0.4, 0.4);

/// `colors.overall` is not measured; every analysis reports this value.
pub const OVERALL_COLOR: &str = "neutral";

/// Always appended after the measured flags. Placeholders, not detections.
pub const BASELINE_FEATURES: [&str; 4] = ["smooth", "even", "defined-eyes", "defined-brows"];

const DARK_BRIGHTNESS: f32 = 100.0;
const LIGHT_BRIGHTNESS: f32 = 180.0;
const GLOW_BRIGHTNESS: f32 = 180.0;
const VIBRANT_SATURATION: f32 = 0.4;
const MATTE_SATURATION: f32 = 0.2;
const DEWY_BRIGHTNESS: f32 = 160.0;
const DEWY_SATURATION: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorClass {
    Dark,
    Medium,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Intensity {
    pub lips: f32,
    pub eyes: f32,
    pub cheeks: f32,
    pub overall: f32,
}

impl Intensity {
    /// Builds the regional intensities; `overall` is their mean.
    pub fn from_regions(lips: f32, eyes: f32, cheeks: f32) -> Self {
        Self {
            lips,
            eyes,
            cheeks,
            overall: (lips + eyes + cheeks) / 3.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionColors {
    pub lips: Vec<ColorClass>,
    pub eyes: Vec<ColorClass>,
    pub overall: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFeatureAnalysis {
    pub intensity: Intensity,
    pub colors: RegionColors,
    pub features: Vec<String>,
}

impl ImageFeatureAnalysis {
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.iter().any(|f| f == feature)
    }
}

/// Buckets a region brightness. Returned as a list so a region can carry several
/// classes later without changing the record shape.
pub fn classify_color(brightness: f32) -> Vec<ColorClass> {
    let class = if brightness < DARK_BRIGHTNESS {
        ColorClass::Dark
    } else if brightness > LIGHT_BRIGHTNESS {
        ColorClass::Light
    } else {
        ColorClass::Medium
    };
    vec![class]
}

/// Coarse appearance flags from the central region, followed by the baseline set.
pub fn detect_features(center: &PixelBuffer) -> Vec<String> {
    let brightness = average_brightness(center);
    let center_saturation = saturation(center);
    let mut features = TagSet::new();

    if brightness > GLOW_BRIGHTNESS {
        features.extend(["brightened", "glow"]);
    }
    if center_saturation > VIBRANT_SATURATION {
        features.extend(["vibrant", "colorful"]);
    }
    if center_saturation < MATTE_SATURATION {
        features.extend(["matte", "neutral"]);
    }
    if brightness > DEWY_BRIGHTNESS && center_saturation > DEWY_SATURATION {
        features.extend(["dewy", "shimmer"]);
    }
    features.extend(BASELINE_FEATURES);

    features.into_vec()
}

/// Samples the lips, eyes and cheeks of a canvas-sized buffer.
pub fn analyze_image_features(canvas: &PixelBuffer) -> ImageFeatureAnalysis {
    let lips = canvas.region(&LIPS_REGION);
    let eyes = canvas.region(&EYES_REGION);
    let cheeks = canvas.region(&CHEEKS_REGION);

    let intensity = Intensity::from_regions(saturation(&lips), saturation(&eyes), saturation(&cheeks));
    let colors = RegionColors {
        lips: classify_color(average_brightness(&lips)),
        eyes: classify_color(average_brightness(&eyes)),
        overall: OVERALL_COLOR.to_string(),
    };
    let features = detect_features(&canvas.region(&CENTER_REGION));

    debug!(
        lips = intensity.lips,
        eyes = intensity.eyes,
        cheeks = intensity.cheeks,
        overall = intensity.overall,
        "image features analyzed"
    );

    ImageFeatureAnalysis {
        intensity,
        colors,
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn uniform(r: u8, g: u8, b: u8) -> PixelBuffer {
        PixelBuffer::filled(64, 48, Pixel::new(r, g, b, 255))
    }

    #[test]
    fn color_classes_split_at_100_and_180() {
        assert_eq!(classify_color(99.9), vec![ColorClass::Dark]);
        assert_eq!(classify_color(100.0), vec![ColorClass::Medium]);
        assert_eq!(classify_color(180.0), vec![ColorClass::Medium]);
        assert_eq!(classify_color(180.1), vec![ColorClass::Light]);
    }

    #[test]
    fn gray_canvas_reads_as_matte_with_no_intensity() {
        let analysis = analyze_image_features(&uniform(128, 128, 128));
        assert_eq!(analysis.intensity, Intensity::default());
        assert_eq!(analysis.colors.lips, vec![ColorClass::Medium]);
        assert_eq!(analysis.colors.overall, "neutral");
        assert_eq!(
            analysis.features,
            vec!["matte", "neutral", "smooth", "even", "defined-eyes", "defined-brows"]
        );
    }

    #[test]
    fn saturated_bright_canvas_is_vibrant_and_dewy() {
        // brightness (255+200+100)/3 = 185, saturation (255-100)/255 = 0.61
        let analysis = analyze_image_features(&uniform(255, 200, 100));
        assert_eq!(
            analysis.features,
            vec![
                "brightened",
                "glow",
                "vibrant",
                "colorful",
                "dewy",
                "shimmer",
                "smooth",
                "even",
                "defined-eyes",
                "defined-brows"
            ]
        );
        assert!((analysis.intensity.overall - 0.6078).abs() < 1e-3);
        assert_eq!(analysis.colors.eyes, vec![ColorClass::Light]);
    }

    #[test]
    fn overall_is_the_mean_of_the_regions() {
        // Paint the lips region fully saturated red on a gray canvas.
        let mut canvas = uniform(128, 128, 128).into_rgba_image().unwrap();
        let rect = LIPS_REGION.to_rect(canvas.width(), canvas.height());
        for y in rect.y..rect.y + rect.height {
            for x in rect.x..rect.x + rect.width {
                canvas.put_pixel(x, y, image::Rgba([200, 0, 0, 255]));
            }
        }
        let analysis = analyze_image_features(&PixelBuffer::from(canvas));
        assert_eq!(analysis.intensity.lips, 1.0);
        assert_eq!(analysis.intensity.eyes, 0.0);
        assert!((analysis.intensity.overall - 1.0 / 3.0).abs() < 1e-6);
        assert_eq!(analysis.colors.lips, vec![ColorClass::Dark]);
    }

    #[test]
    fn baseline_features_are_always_present() {
        for canvas in [uniform(0, 0, 0), uniform(255, 255, 255), uniform(255, 0, 0)] {
            let analysis = analyze_image_features(&canvas);
            for feature in BASELINE_FEATURES {
                assert!(analysis.has_feature(feature));
            }
        }
    }

    #[test]
    fn tiny_canvas_still_samples_every_region() {
        let analysis = analyze_image_features(&PixelBuffer::filled(
            2,
            2,
            Pixel::new(255, 0, 0, 255),
        ));
        assert_eq!(analysis.intensity.overall, 1.0);
    }
}
