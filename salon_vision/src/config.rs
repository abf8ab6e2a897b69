use crate::core_modules::scrfd::Threshold;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix for environment overrides, e.g. `SALON_VISION__MODEL_PATH`.
pub const ENV_PREFIX: &str = "SALON_VISION";
const ENV_SEPARATOR: &str = "__";

/// Tunables for the analyzer. Every field has a default, so a partial file or no file
/// at all is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// SCRFD ONNX weights for the face locator.
    pub model_path: PathBuf,
    /// Canvas used by the feature analyzer when an image reports no extent.
    pub default_canvas_width: u32,
    pub default_canvas_height: u32,
    /// Minimum detector score for a face candidate.
    pub score_threshold: f32,
    /// Overlap above which two face candidates are considered the same face.
    pub iou_threshold: f32,
    /// Tagging jobs in flight at once in a batch. Defaults to the logical CPU count.
    pub batch_concurrency: Option<usize>,
    /// Timeout for fetching an image over HTTP. No timeout when unset.
    pub fetch_timeout_secs: Option<u64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/scrfd.onnx"),
            default_canvas_width: 640,
            default_canvas_height: 480,
            score_threshold: 0.4,
            iou_threshold: 0.5,
            batch_concurrency: None,
            fetch_timeout_secs: None,
        }
    }
}

impl AnalyzerConfig {
    /// Defaults, overlaid by `file` (any format the `config` crate recognizes from
    /// the extension) and then by `SALON_VISION__*` environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn detection_threshold(&self) -> Threshold {
        Threshold {
            score: self.score_threshold,
            iou: self.iou_threshold,
        }
    }

    pub fn batch_concurrency(&self) -> usize {
        self.batch_concurrency
            .filter(|n| *n > 0)
            .unwrap_or_else(num_cpus::get)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}
