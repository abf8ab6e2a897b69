// THEORY:
// The skin tone classifier maps one averaged RGB triple onto the two axes the salon
// uses to pick shades: a seven-step lightness bucket and a warm/cool/neutral
// undertone. Both are fixed threshold tables rather than learned models, which keeps
// them deterministic and cheap to test.
//
// The undertone rules are approximate heuristics over channel ratios, not a validated
// colorimetric measure. They are good enough to steer a foundation or lipstick
// suggestion and nothing more.

use crate::core_modules::color_sampler::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seven-level brightness classification of a skin sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkinToneBucket {
    VeryLight,
    Light,
    MediumLight,
    Medium,
    MediumDeep,
    Deep,
    VeryDeep,
}

impl SkinToneBucket {
    pub const ALL: [SkinToneBucket; 7] = [
        SkinToneBucket::VeryLight,
        SkinToneBucket::Light,
        SkinToneBucket::MediumLight,
        SkinToneBucket::Medium,
        SkinToneBucket::MediumDeep,
        SkinToneBucket::Deep,
        SkinToneBucket::VeryDeep,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinToneBucket::VeryLight => "very-light",
            SkinToneBucket::Light => "light",
            SkinToneBucket::MediumLight => "medium-light",
            SkinToneBucket::Medium => "medium",
            SkinToneBucket::MediumDeep => "medium-deep",
            SkinToneBucket::Deep => "deep",
            SkinToneBucket::VeryDeep => "very-deep",
        }
    }
}

impl fmt::Display for SkinToneBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SkinToneBucket {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SkinToneBucket::ALL
            .into_iter()
            .find(|bucket| bucket.as_str() == value)
            .ok_or_else(|| format!("unknown skin tone '{}'", value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Undertone {
    Warm,
    Cool,
    Neutral,
}

impl Undertone {
    pub const ALL: [Undertone; 3] = [Undertone::Warm, Undertone::Cool, Undertone::Neutral];

    pub fn as_str(&self) -> &'static str {
        match self {
            Undertone::Warm => "warm",
            Undertone::Cool => "cool",
            Undertone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Undertone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Undertone {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Undertone::ALL
            .into_iter()
            .find(|undertone| undertone.as_str() == value)
            .ok_or_else(|| format!("unknown undertone '{}'", value))
    }
}

/// Lower bounds (exclusive) of each bucket, lightest first.
const BRIGHTNESS_THRESHOLDS: [(f64, SkinToneBucket); 6] = [
    (220.0, SkinToneBucket::VeryLight),
    (190.0, SkinToneBucket::Light),
    (160.0, SkinToneBucket::MediumLight),
    (130.0, SkinToneBucket::Medium),
    (100.0, SkinToneBucket::MediumDeep),
    (70.0, SkinToneBucket::Deep),
];

const WARM_RED_GREEN_RATIO: f64 = 1.1;
const WARM_BLUE_GREEN_RATIO: f64 = 0.95;
const COOL_BLUE_GREEN_RATIO: f64 = 1.0;
const COOL_MIN_RED: u8 = 180;
const COOL_MIN_BLUE: u8 = 140;

/// Buckets `(r+g+b)/3`. A value sitting exactly on a threshold falls to the darker side.
pub fn classify_brightness(r: u8, g: u8, b: u8) -> SkinToneBucket {
    let average = (r as f64 + g as f64 + b as f64) / 3.0;
    BRIGHTNESS_THRESHOLDS
        .iter()
        .find(|(threshold, _)| average > *threshold)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(SkinToneBucket::VeryDeep)
}

/// Warm/cool/neutral from the red:green and blue:green ratios. Rule order matters:
/// warm is tested first, cool second, neutral is the remainder.
pub fn classify_undertone(rgb: Rgb) -> Undertone {
    let green = rgb.g as f64 + 1.0;
    let red_green_ratio = rgb.r as f64 / green;
    let blue_green_ratio = rgb.b as f64 / green;

    if red_green_ratio > WARM_RED_GREEN_RATIO && blue_green_ratio < WARM_BLUE_GREEN_RATIO {
        Undertone::Warm
    } else if blue_green_ratio > COOL_BLUE_GREEN_RATIO
        || (rgb.r > COOL_MIN_RED && rgb.b > COOL_MIN_BLUE)
    {
        Undertone::Cool
    } else {
        Undertone::Neutral
    }
}

/// Shade suggestions for one undertone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductRecommendationSet {
    pub foundation: &'static [&'static str],
    pub lipstick: &'static [&'static str],
    pub blush: &'static [&'static str],
    pub eyeshadow: &'static [&'static str],
}

static WARM_RECOMMENDATIONS: ProductRecommendationSet = ProductRecommendationSet {
    foundation: &["Golden Beige", "Warm Honey", "Caramel", "Warm Sand"],
    lipstick: &["Coral", "Brick Red", "Warm Nude", "Terracotta"],
    blush: &["Peach", "Apricot", "Warm Bronze"],
    eyeshadow: &["Gold", "Copper", "Bronze", "Olive Green"],
};

static COOL_RECOMMENDATIONS: ProductRecommendationSet = ProductRecommendationSet {
    foundation: &["Porcelain Pink", "Rose Beige", "Cool Ivory", "Cool Espresso"],
    lipstick: &["Berry", "Blue Red", "Mauve", "Plum"],
    blush: &["Cool Pink", "Rose", "Soft Plum"],
    eyeshadow: &["Silver", "Plum", "Navy", "Cool Taupe"],
};

static NEUTRAL_RECOMMENDATIONS: ProductRecommendationSet = ProductRecommendationSet {
    foundation: &["Natural Beige", "Buff", "Sand", "Neutral Tan"],
    lipstick: &["Nude Pink", "Rosewood", "Classic Red", "Dusty Rose"],
    blush: &["Soft Rose", "Dusty Pink", "Neutral Peach"],
    eyeshadow: &["Champagne", "Taupe", "Soft Brown", "Mauve"],
};

pub fn recommendations_for(undertone: Undertone) -> &'static ProductRecommendationSet {
    match undertone {
        Undertone::Warm => &WARM_RECOMMENDATIONS,
        Undertone::Cool => &COOL_RECOMMENDATIONS,
        Undertone::Neutral => &NEUTRAL_RECOMMENDATIONS,
    }
}

/// One-line summary shown next to the analysis.
pub fn describe(bucket: SkinToneBucket, undertone: Undertone) -> String {
    format!("Detected {} skin with {} undertones.", bucket, undertone)
}
