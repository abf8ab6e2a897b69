// THEORY:
// The `pipeline` module is the top-level API of the analysis engine. It wires the
// core modules into the three operations the salon site calls:
//
// 1.  `analyze_skin_tone`: before-photo -> face box -> face crop -> averaged skin
//     color -> brightness bucket + undertone + shade suggestions.
// 2.  `analyze_image_features`: after-photo -> fixed facial regions -> intensity,
//     color classes and coarse feature flags.
// 3.  `tag_photo`: both of the above, then the rule tables, producing one immutable
//     `TaggedPhoto` for the gallery.
//
// Each call is independent and fail-fast. The only state shared between calls is the
// lazily loaded face model, which is read-only once loaded. CPU-heavy work (detector
// inference, cropping) runs on tokio's blocking pool so a busy server keeps serving.

use crate::config::AnalyzerConfig;
use crate::core_modules::color_sampler::sample_skin_color;
use crate::core_modules::face_locator::{LazyFaceLocator, global_face_locator};
use crate::core_modules::feature_analyzer::analyze_image_features;
use crate::core_modules::pixel::pixel::Pixel;
use crate::core_modules::pixel_buffer::PixelBuffer;
use crate::core_modules::skin_tone::{
    classify_brightness, classify_undertone, describe, recommendations_for,
};
use crate::core_modules::tagged_photo::PhotoStamp;
use crate::error::{Result, VisionError};
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

// Re-export key data structures for the public API.
pub use crate::core_modules::color_sampler::{Rgb, SkinColorSample};
pub use crate::core_modules::face_locator::{FaceLocator, FaceRegion};
pub use crate::core_modules::feature_analyzer::ImageFeatureAnalysis;
pub use crate::core_modules::pixel_buffer::Rect;
pub use crate::core_modules::skin_tone::{ProductRecommendationSet, SkinToneBucket, Undertone};
pub use crate::core_modules::tagged_photo::{Metadata, SkinToneTag, TaggedPhoto};
pub use crate::image_source::ImageSource;

/// The complete skin tone reading of one photo.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkinToneResult {
    pub skin_color: SkinColorSample,
    pub undertone: Undertone,
    pub skin_tone: SkinToneBucket,
    pub recommendations: &'static ProductRecommendationSet,
    /// Detector confidence for the face the color was sampled from.
    pub confidence: f32,
    pub face_box: Rect,
    pub description: String,
}

impl SkinToneResult {
    /// Classifies an already cropped face. Pure; the detector is not involved.
    pub fn from_face_crop(face: FaceRegion, crop: &PixelBuffer) -> Result<Self> {
        let skin_color = sample_skin_color(crop)?;
        let rgb = skin_color.rgb;
        let skin_tone = classify_brightness(rgb.r, rgb.g, rgb.b);
        let undertone = classify_undertone(rgb);

        Ok(Self {
            recommendations: recommendations_for(undertone),
            description: describe(skin_tone, undertone),
            confidence: face.confidence,
            face_box: face.face_box,
            skin_color,
            undertone,
            skin_tone,
        })
    }
}

impl From<&SkinToneResult> for SkinToneTag {
    fn from(result: &SkinToneResult) -> Self {
        SkinToneTag {
            category: result.skin_tone,
            undertone: result.undertone,
            hex: result.skin_color.hex.clone(),
        }
    }
}

/// A skin tone reading together with the face crop it was sampled from.
#[derive(Debug, Clone)]
pub struct SkinToneAnalysis {
    pub result: SkinToneResult,
    pub face_crop: PixelBuffer,
}

/// The main entry point of the analysis engine.
#[derive(Clone)]
pub struct SalonPipeline {
    config: AnalyzerConfig,
    locator: Arc<LazyFaceLocator>,
}

impl SalonPipeline {
    /// Uses the process-wide face locator.
    pub fn new(config: AnalyzerConfig) -> Self {
        let locator = global_face_locator(&config);
        Self { config, locator }
    }

    /// Uses a caller-provided locator instead of the process-wide one.
    pub fn with_locator(config: AnalyzerConfig, locator: Arc<LazyFaceLocator>) -> Self {
        Self { config, locator }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub async fn analyze_skin_tone(&self, source: ImageSource) -> Result<SkinToneResult> {
        Ok(self.analyze_skin_tone_detailed(source).await?.result)
    }

    /// Like `analyze_skin_tone`, but also hands back the sampled face crop.
    pub async fn analyze_skin_tone_detailed(&self, source: ImageSource) -> Result<SkinToneAnalysis> {
        let image = source.load(self.config.fetch_timeout()).await?;
        let locator = self.locator.get().await?;

        let (face, face_crop) = tokio::task::spawn_blocking(move || -> Result<_> {
            let face = locator.locate_face(&image.to_rgb8())?;
            let crop = PixelBuffer::from_image(&image).crop(face.face_box);
            Ok((face, crop))
        })
        .await
        .map_err(|err| VisionError::Analysis(err.to_string()))??;

        let result = SkinToneResult::from_face_crop(face, &face_crop)?;
        info!(
            skin_tone = %result.skin_tone,
            undertone = %result.undertone,
            hex = %result.skin_color.hex,
            confidence = result.confidence,
            "skin tone analyzed"
        );
        Ok(SkinToneAnalysis { result, face_crop })
    }

    pub async fn analyze_image_features(&self, source: ImageSource) -> Result<ImageFeatureAnalysis> {
        let image = source.load(self.config.fetch_timeout()).await?;
        Ok(analyze_image_features(&self.canvas(&image)))
    }

    /// Tags a before/after pair. `before` drives the skin tone, `after` the makeup.
    /// Any failure aborts the whole call and no record is produced.
    pub async fn tag_photo(
        &self,
        before: ImageSource,
        after: ImageSource,
        metadata: Option<Metadata>,
    ) -> Result<TaggedPhoto> {
        let skin_tone = self
            .analyze_skin_tone(before)
            .await
            .map_err(VisionError::tagging)?;
        let features = self
            .analyze_image_features(after)
            .await
            .map_err(VisionError::tagging)?;

        let photo = TaggedPhoto::assemble(
            SkinToneTag::from(&skin_tone),
            &features,
            metadata.unwrap_or_default(),
            PhotoStamp::now(),
        );
        info!(id = %photo.id, tags = photo.tags.len(), "photo tagged");
        Ok(photo)
    }

    /// The image drawn at its natural size, or a blank default canvas when the image
    /// has no extent.
    fn canvas(&self, image: &DynamicImage) -> PixelBuffer {
        if image.width() == 0 || image.height() == 0 {
            warn!(
                width = self.config.default_canvas_width,
                height = self.config.default_canvas_height,
                "image has no extent, analyzing a blank default canvas"
            );
            return PixelBuffer::filled(
                self.config.default_canvas_width,
                self.config.default_canvas_height,
                Pixel::default(),
            );
        }
        PixelBuffer::from_image(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage, RgbImage};

    struct CenterLocator;

    impl FaceLocator for CenterLocator {
        fn locate_face(&self, image: &RgbImage) -> Result<FaceRegion> {
            Ok(FaceRegion {
                face_box: Rect::new(image.width() / 4, image.height() / 4, image.width() / 2, image.height() / 2),
                confidence: 0.88,
            })
        }
    }

    fn pipeline() -> SalonPipeline {
        SalonPipeline::with_locator(
            AnalyzerConfig::default(),
            Arc::new(LazyFaceLocator::ready(Arc::new(CenterLocator))),
        )
    }

    /// Skin in the middle, blue everywhere else.
    fn portrait() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(40, 40, |x, y| {
            if (10..30).contains(&x) && (10..30).contains(&y) {
                Rgba([200, 170, 150, 255])
            } else {
                Rgba([20, 40, 220, 255])
            }
        }))
    }

    #[tokio::test]
    async fn skin_tone_is_read_from_the_face_crop() {
        let analysis = pipeline()
            .analyze_skin_tone_detailed(ImageSource::from(portrait()))
            .await
            .unwrap();
        let result = analysis.result;

        assert_eq!(result.skin_color.rgb, Rgb::new(200, 170, 150));
        assert_eq!(result.skin_tone, SkinToneBucket::MediumLight);
        assert_eq!(result.undertone, Undertone::Warm);
        assert_eq!(result.face_box, Rect::new(10, 10, 20, 20));
        assert_eq!(result.confidence, 0.88);
        assert_eq!(result.recommendations, recommendations_for(Undertone::Warm));
        assert_eq!((analysis.face_crop.width(), analysis.face_crop.height()), (20, 20));
    }

    #[tokio::test]
    async fn skin_tone_serializes_with_camel_case_keys() {
        let result = pipeline()
            .analyze_skin_tone(ImageSource::from(portrait()))
            .await
            .unwrap();
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["skinTone"], "medium-light");
        assert_eq!(json["undertone"], "warm");
        assert_eq!(json["skinColor"]["hex"], "#c8aa96");
        assert_eq!(json["faceBox"]["x"], 10);
        assert!(json["recommendations"]["foundation"].is_array());
        assert_eq!(json["description"], "Detected medium-light skin with warm undertones.");
    }

    #[tokio::test]
    async fn empty_image_is_analyzed_as_the_default_canvas() {
        let features = pipeline()
            .analyze_image_features(ImageSource::from(DynamicImage::new_rgba8(0, 0)))
            .await
            .unwrap();
        assert_eq!(features.intensity.overall, 0.0);
        assert!(features.has_feature("matte"));
    }

    #[test]
    fn skin_tone_tag_copies_the_classification() {
        let face = FaceRegion {
            face_box: Rect::new(0, 0, 4, 4),
            confidence: 1.0,
        };
        let crop = PixelBuffer::filled(4, 4, Pixel::new(90, 100, 105, 255));
        let result = SkinToneResult::from_face_crop(face, &crop).unwrap();
        let tag = SkinToneTag::from(&result);
        assert_eq!(tag.undertone, Undertone::Cool);
        assert_eq!(tag.category, SkinToneBucket::Deep);
        assert_eq!(tag.hex, "#5a6469");
    }
}
