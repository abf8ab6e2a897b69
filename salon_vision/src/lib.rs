// THEORY:
// This file is the main entry point for the `salon_vision` library crate. It defines
// the public API exposed to the salon website's backend and to the `salon_tester`
// command line tool.
//
// The primary export is `SalonPipeline`, which runs the three analyses the site uses
// (skin tone, makeup features, photo tagging), and the gallery functions that search
// and aggregate the resulting `TaggedPhoto` records. The building blocks live in
// `core_modules` and stay public so integrators can swap the face locator or reuse
// the samplers on their own frames.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod gallery;
pub mod image_source;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::AnalyzerConfig;
pub use error::{Result, VisionError};
pub use gallery::{
    FilterOptions, PhotoFilters, TagCount, TagFrequencyTable, filter_options, get_popular_tags,
    search_photos,
};
pub use image_source::ImageSource;
pub use parallel_pipeline::TagRequest;
pub use pipeline::{SalonPipeline, SkinToneAnalysis, SkinToneResult};
