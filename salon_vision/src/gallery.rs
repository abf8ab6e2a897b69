// THEORY:
// The gallery functions answer the two questions a photo browser asks of a corpus of
// `TaggedPhoto` records: "which photos match these filters" and "which tags are most
// common". They never touch pixels and never mutate; they read a snapshot slice the
// caller owns (loaded from whatever store holds the gallery).
//
// Filter semantics: categories are AND-combined, values inside one category are
// OR-combined. An empty category and an empty query impose nothing, so the default
// `PhotoFilters` matches everything.

use crate::core_modules::tag_set::TagSet;
use crate::core_modules::tagged_photo::TaggedPhoto;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Entries kept per popularity list.
pub const POPULAR_TAG_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PhotoFilters {
    pub styles: Vec<String>,
    pub products: Vec<String>,
    pub skin_tones: Vec<String>,
    pub undertones: Vec<String>,
    pub occasions: Vec<String>,
    pub search_query: Option<String>,
}

impl PhotoFilters {
    pub fn matches(&self, photo: &TaggedPhoto) -> bool {
        any_of(&self.styles, &photo.makeup.styles)
            && any_of(&self.products, &photo.products)
            && one_of(&self.skin_tones, photo.skin_tone.category.as_str())
            && one_of(&self.undertones, photo.skin_tone.undertone.as_str())
            && any_of(&self.occasions, &photo.occasions)
            && self.matches_query(photo)
    }

    fn matches_query(&self, photo: &TaggedPhoto) -> bool {
        match self.search_query.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(query) => photo
                .searchable_text()
                .to_lowercase()
                .contains(&query.to_lowercase()),
        }
    }
}

/// True when `wanted` is empty or shares a value with `present`.
fn any_of(wanted: &[String], present: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|value| present.contains(value))
}

fn one_of(wanted: &[String], actual: &str) -> bool {
    wanted.is_empty() || wanted.iter().any(|value| value == actual)
}

/// Photos matching `filters`, in input order.
pub fn search_photos<'a>(photos: &'a [TaggedPhoto], filters: &PhotoFilters) -> Vec<&'a TaggedPhoto> {
    photos.iter().filter(|photo| filters.matches(photo)).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagFrequencyTable {
    pub all_tags: Vec<TagCount>,
    pub styles: Vec<TagCount>,
    pub products: Vec<TagCount>,
}

/// Most used tags, styles and products across `photos`.
pub fn get_popular_tags(photos: &[TaggedPhoto]) -> TagFrequencyTable {
    TagFrequencyTable {
        all_tags: most_common(photos.iter().flat_map(|photo| &photo.tags)),
        styles: most_common(photos.iter().flat_map(|photo| &photo.makeup.styles)),
        products: most_common(photos.iter().flat_map(|photo| &photo.products)),
    }
}

/// Counts descending; ties keep the order in which tags were first seen.
fn most_common<'a>(tags: impl Iterator<Item = &'a String>) -> Vec<TagCount> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for tag in tags {
        *counts.entry(tag.as_str()).or_insert(0) += 1;
    }
    // `sort_by` is stable, which keeps first-seen order among equal counts.
    counts.sort_by(|_, left, _, right| right.cmp(left));
    counts
        .into_iter()
        .take(POPULAR_TAG_LIMIT)
        .map(|(tag, count)| TagCount {
            tag: tag.to_string(),
            count,
        })
        .collect()
}

/// The values present in a corpus for each filter category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub styles: Vec<String>,
    pub products: Vec<String>,
    pub skin_tones: Vec<String>,
    pub undertones: Vec<String>,
    pub occasions: Vec<String>,
}

pub fn filter_options(photos: &[TaggedPhoto]) -> FilterOptions {
    let mut styles = TagSet::new();
    let mut products = TagSet::new();
    let mut skin_tones = TagSet::new();
    let mut undertones = TagSet::new();
    let mut occasions = TagSet::new();

    for photo in photos {
        styles.extend(photo.makeup.styles.iter().cloned());
        products.extend(photo.products.iter().cloned());
        skin_tones.insert(photo.skin_tone.category.as_str());
        undertones.insert(photo.skin_tone.undertone.as_str());
        occasions.extend(photo.occasions.iter().cloned());
    }

    FilterOptions {
        styles: styles.into_vec(),
        products: products.into_vec(),
        skin_tones: skin_tones.into_vec(),
        undertones: undertones.into_vec(),
        occasions: occasions.into_vec(),
    }
}
