// THEORY:
// A `TaggedPhoto` is the durable output of the tagger: everything the gallery needs to
// search and aggregate without touching pixels again. It is created once and never
// mutated; storage belongs to whoever holds the gallery.
//
// Assembly is split from stamping. `TaggedPhoto::assemble` is a pure function of the
// skin tone, the feature analysis, caller metadata and a `PhotoStamp`; only
// `PhotoStamp::now` reads the clock and the random source. Tests pin the stamp and
// get a fully deterministic record.

use crate::core_modules::feature_analyzer::ImageFeatureAnalysis;
use crate::core_modules::skin_tone::{SkinToneBucket, Undertone};
use crate::core_modules::tag_rules::{derive_occasions, derive_products, derive_styles};
use crate::core_modules::tag_set::TagSet;
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Metadata = Map<String, Value>;

const ID_SUFFIX_LEN: usize = 9;
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinToneTag {
    pub category: SkinToneBucket,
    pub undertone: Undertone,
    pub hex: String,
}

impl SkinToneTag {
    /// The four skin descriptors that end every tag list, in order.
    pub fn descriptors(&self) -> [String; 4] {
        [
            self.undertone.to_string(),
            self.category.to_string(),
            format!("{}-undertone", self.undertone),
            format!("{}-skin", self.category),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MakeupSummary {
    pub styles: Vec<String>,
    /// Overall intensity of the after-photo.
    pub intensity: f32,
    pub features: Vec<String>,
}

/// Identity and time of one tagging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoStamp {
    pub id: String,
    pub timestamp: i64,
    pub tagged_at: String,
}

impl PhotoStamp {
    pub fn now() -> Self {
        let now = Utc::now();
        let timestamp = now.timestamp_millis();
        let mut rng = rand::thread_rng();
        let suffix: String = (0..ID_SUFFIX_LEN)
            .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
            .collect();

        Self {
            id: format!("{}-{}", timestamp, suffix),
            timestamp,
            tagged_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedPhoto {
    pub id: String,
    pub timestamp: i64,
    pub skin_tone: SkinToneTag,
    pub makeup: MakeupSummary,
    pub products: Vec<String>,
    pub occasions: Vec<String>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TaggedPhoto {
    /// Derives styles, products, occasions and tags and stamps the record.
    /// `autoTagged` and `taggedAt` overwrite caller keys of the same name.
    pub fn assemble(
        skin_tone: SkinToneTag,
        analysis: &ImageFeatureAnalysis,
        mut metadata: Metadata,
        stamp: PhotoStamp,
    ) -> Self {
        let styles = derive_styles(analysis);
        let products = derive_products(analysis);
        let occasions = derive_occasions(&styles);

        let mut tags = TagSet::new();
        tags.extend(styles.iter().cloned());
        tags.extend(products.iter().cloned());
        tags.extend(occasions.iter().cloned());
        tags.extend(skin_tone.descriptors());

        metadata.insert("autoTagged".to_string(), Value::Bool(true));
        metadata.insert("taggedAt".to_string(), Value::String(stamp.tagged_at));

        Self {
            id: stamp.id,
            timestamp: stamp.timestamp,
            skin_tone,
            makeup: MakeupSummary {
                styles,
                intensity: analysis.intensity.overall,
                features: analysis.features.clone(),
            },
            products,
            occasions,
            tags: tags.into_vec(),
            metadata,
        }
    }

    /// Styles, products, occasions and tags joined by spaces, for free-text search.
    pub fn searchable_text(&self) -> String {
        self.tags
            .iter()
            .chain(&self.makeup.styles)
            .chain(&self.products)
            .chain(&self.occasions)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::feature_analyzer::{ColorClass, Intensity, RegionColors};
    use serde_json::json;

    fn matte_analysis() -> ImageFeatureAnalysis {
        ImageFeatureAnalysis {
            intensity: Intensity::from_regions(0.1, 0.1, 0.1),
            colors: RegionColors {
                lips: vec![ColorClass::Medium],
                eyes: vec![ColorClass::Medium],
                overall: "neutral".to_string(),
            },
            features: ["matte", "neutral", "smooth", "even", "defined-eyes", "defined-brows"]
                .iter()
                .map(|f| f.to_string())
                .collect(),
        }
    }

    fn skin() -> SkinToneTag {
        SkinToneTag {
            category: SkinToneBucket::MediumLight,
            undertone: Undertone::Warm,
            hex: "#c8aa96".to_string(),
        }
    }

    fn stamp() -> PhotoStamp {
        PhotoStamp {
            id: "1700000000000-abc123xyz".to_string(),
            timestamp: 1_700_000_000_000,
            tagged_at: "2023-11-14T22:13:20.000Z".to_string(),
        }
    }

    #[test]
    fn tags_are_the_ordered_union_of_every_derivation() {
        let photo = TaggedPhoto::assemble(skin(), &matte_analysis(), Metadata::new(), stamp());

        assert_eq!(
            photo.makeup.styles,
            vec!["Natural", "No-Makeup Makeup", "Nude", "Neutral", "Everyday"]
        );
        assert_eq!(photo.occasions, vec!["Everyday", "Work", "Casual"]);

        let mut expected: Vec<String> = Vec::new();
        for tag in photo
            .makeup
            .styles
            .iter()
            .chain(&photo.products)
            .chain(&photo.occasions)
            .cloned()
            .chain(skin().descriptors())
        {
            if !expected.contains(&tag) {
                expected.push(tag);
            }
        }
        assert_eq!(photo.tags, expected);
        // "Everyday" is both a style and an occasion but appears once.
        assert_eq!(photo.tags.iter().filter(|t| *t == "Everyday").count(), 1);
        assert_eq!(
            &photo.tags[photo.tags.len() - 4..],
            ["warm", "medium-light", "warm-undertone", "medium-light-skin"]
        );
    }

    #[test]
    fn stamp_wins_over_caller_metadata() {
        let metadata = json!({ "stylist": "Ana", "autoTagged": false, "taggedAt": "yesterday" });
        let Value::Object(metadata) = metadata else {
            unreachable!()
        };
        let photo = TaggedPhoto::assemble(skin(), &matte_analysis(), metadata, stamp());

        assert_eq!(photo.metadata["stylist"], "Ana");
        assert_eq!(photo.metadata["autoTagged"], true);
        assert_eq!(photo.metadata["taggedAt"], "2023-11-14T22:13:20.000Z");
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let photo = TaggedPhoto::assemble(skin(), &matte_analysis(), Metadata::new(), stamp());
        let value = serde_json::to_value(&photo).unwrap();
        assert_eq!(value["skinTone"]["category"], "medium-light");
        assert_eq!(value["skinTone"]["undertone"], "warm");
        assert_eq!(value["id"], "1700000000000-abc123xyz");

        let back: TaggedPhoto = serde_json::from_value(value).unwrap();
        assert_eq!(back, photo);
    }

    #[test]
    fn fresh_stamps_have_the_documented_shape() {
        let stamp = PhotoStamp::now();
        let (millis, suffix) = stamp.id.split_once('-').unwrap();
        assert_eq!(millis, stamp.timestamp.to_string());
        assert_eq!(suffix.len(), ID_SUFFIX_LEN);
        assert!(
            suffix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert!(stamp.tagged_at.ends_with('Z'));
        assert_ne!(PhotoStamp::now().id, PhotoStamp::now().id);
    }
}
