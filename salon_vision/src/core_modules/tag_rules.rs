// THEORY:
// Styles, products and occasions are derived by ordered rule tables. Each rule is a
// plain predicate over an `ImageFeatureAnalysis` plus the tags it contributes. Rules
// are evaluated top to bottom and every match contributes its tags. The output keeps
// first-seen order and drops duplicates, so table order is observable.
//
// Some style rules cannot fire on analyses produced by this crate: `colors.overall`
// is always "neutral" and the feature analyzer never emits "creative" or "artistic".
// They stay in the table because analyses may also come from elsewhere (a stored
// record, a richer analyzer), and the tables are the single source of the salon's
// vocabulary.
//
// Occasions are not derived from the analysis directly. They are looked up from the
// styles: each group of styles maps to a fixed set of occasions.

use crate::core_modules::feature_analyzer::{ColorClass, ImageFeatureAnalysis};
use crate::core_modules::tag_set::TagSet;

pub type Predicate = fn(&ImageFeatureAnalysis) -> bool;

#[derive(Debug, Clone, Copy)]
pub struct TagRule {
    pub name: &'static str,
    pub predicate: Predicate,
    pub tags: &'static [&'static str],
}

impl TagRule {
    pub fn matches(&self, analysis: &ImageFeatureAnalysis) -> bool {
        (self.predicate)(analysis)
    }
}

/// A group of styles and the occasions any of them implies.
#[derive(Debug, Clone, Copy)]
pub struct OccasionGroup {
    pub styles: &'static [&'static str],
    pub occasions: &'static [&'static str],
}

pub static STYLE_RULES: [TagRule; 8] = [
    TagRule {
        name: "natural",
        predicate: |a| a.intensity.overall < 0.3,
        tags: &["Natural", "No-Makeup Makeup"],
    },
    TagRule {
        name: "glamorous",
        predicate: |a| a.intensity.overall > 0.7,
        tags: &["Glamorous", "Evening", "Full Glam"],
    },
    TagRule {
        name: "smokey-eye",
        predicate: |a| a.intensity.eyes > 0.6 && a.colors.eyes.contains(&ColorClass::Dark),
        tags: &["Smokey Eye"],
    },
    TagRule {
        name: "bold-lips",
        predicate: |a| a.intensity.lips > 0.7,
        tags: &["Bold Lips", "Statement Lips"],
    },
    TagRule {
        name: "nude",
        predicate: |a| a.colors.overall == "neutral" && a.intensity.overall < 0.5,
        tags: &["Nude", "Neutral", "Everyday"],
    },
    TagRule {
        name: "bridal",
        predicate: |a| {
            (0.5..=1.0).contains(&a.intensity.overall)
                && a.colors.overall == "soft"
                && a.has_feature("dewy")
        },
        tags: &["Bridal", "Romantic"],
    },
    TagRule {
        name: "editorial",
        predicate: |a| a.has_feature("creative") || a.has_feature("artistic"),
        tags: &["Editorial", "Artistic"],
    },
    TagRule {
        name: "soft-glam",
        predicate: |a| (0.4..=0.6).contains(&a.intensity.overall),
        tags: &["Soft Glam", "Date Night"],
    },
];

pub static PRODUCT_RULES: [TagRule; 11] = [
    TagRule {
        name: "base",
        predicate: |a| a.has_feature("smooth") || a.has_feature("even"),
        tags: &["Foundation", "Primer"],
    },
    TagRule {
        name: "powder",
        predicate: |a| a.has_feature("matte"),
        tags: &["Setting Powder"],
    },
    TagRule {
        name: "spray",
        predicate: |a| a.has_feature("dewy"),
        tags: &["Setting Spray"],
    },
    TagRule {
        name: "blush",
        predicate: |a| a.intensity.cheeks > 0.3,
        tags: &["Blush"],
    },
    TagRule {
        name: "contour",
        predicate: |a| a.intensity.cheeks > 0.5,
        tags: &["Bronzer", "Contour"],
    },
    TagRule {
        name: "highlight",
        predicate: |a| a.has_feature("glow") || a.has_feature("shimmer"),
        tags: &["Highlighter"],
    },
    TagRule {
        name: "eyeshadow",
        predicate: |a| a.intensity.eyes > 0.3,
        tags: &["Eyeshadow"],
    },
    TagRule {
        name: "eyeliner",
        predicate: |a| a.intensity.eyes > 0.5 || a.has_feature("defined-eyes"),
        tags: &["Eyeliner", "Mascara"],
    },
    TagRule {
        name: "brows",
        predicate: |a| a.has_feature("defined-brows"),
        tags: &["Brow Pencil"],
    },
    TagRule {
        name: "lipstick",
        predicate: |a| a.intensity.lips > 0.3,
        tags: &["Lipstick"],
    },
    TagRule {
        name: "gloss",
        predicate: |a| a.intensity.lips > 0.3 && a.has_feature("glossy-lips"),
        tags: &["Lip Gloss"],
    },
];

pub static OCCASION_GROUPS: [OccasionGroup; 5] = [
    OccasionGroup {
        styles: &["Natural", "Everyday"],
        occasions: &["Everyday", "Work", "Casual"],
    },
    OccasionGroup {
        styles: &["Glamorous", "Full Glam"],
        occasions: &["Party", "Night Out", "Special Event"],
    },
    OccasionGroup {
        styles: &["Bridal"],
        occasions: &["Wedding", "Engagement", "Formal Event"],
    },
    OccasionGroup {
        styles: &["Soft Glam", "Date Night"],
        occasions: &["Date Night", "Dinner", "Semi-Formal"],
    },
    OccasionGroup {
        styles: &["Editorial"],
        occasions: &["Photoshoot", "Fashion Event", "Creative"],
    },
];

/// Tags of every matching rule, in table order, without duplicates.
pub fn apply_rules(rules: &[TagRule], analysis: &ImageFeatureAnalysis) -> Vec<String> {
    rules
        .iter()
        .filter(|rule| rule.matches(analysis))
        .flat_map(|rule| rule.tags.iter().copied())
        .collect::<TagSet>()
        .into_vec()
}

pub fn derive_styles(analysis: &ImageFeatureAnalysis) -> Vec<String> {
    apply_rules(&STYLE_RULES, analysis)
}

pub fn derive_products(analysis: &ImageFeatureAnalysis) -> Vec<String> {
    apply_rules(&PRODUCT_RULES, analysis)
}

/// Occasions implied by `styles`, in group order.
pub fn derive_occasions(styles: &[String]) -> Vec<String> {
    OCCASION_GROUPS
        .iter()
        .filter(|group| {
            group
                .styles
                .iter()
                .any(|style| styles.iter().any(|s| s == style))
        })
        .flat_map(|group| group.occasions.iter().copied())
        .collect::<TagSet>()
        .into_vec()
}
