// THEORY:
// The face locator is the only part of the pipeline that depends on a trained model,
// and it is deliberately kept behind the narrowest interface that works: give it an
// image, get back one box and a confidence, or `NoFaceDetected`. Everything
// downstream (cropping, sampling, classifying) is library-agnostic and can be tested
// with a stub locator.
//
// Key architectural principles:
// 1.  **Capability trait**: `FaceLocator` is object safe and `Send + Sync`, so one
//     loaded model can be shared across concurrent analyses behind an `Arc`.
// 2.  **Load once, explicitly**: Model weights are expensive to fetch and parse.
//     `LazyFaceLocator` owns a `tokio::sync::OnceCell`; the first caller runs the
//     loader and every concurrent caller awaits that same in-flight load. Once loaded
//     the model is read-only and lives for the rest of the process. A failed load is
//     not cached, so a later request can try again.
// 3.  **Process-wide instance**: `global_face_locator` exposes one shared
//     `LazyFaceLocator` for hosts that do not want to thread their own through.

use crate::config::AnalyzerConfig;
use crate::core_modules::pixel_buffer::Rect;
use crate::core_modules::scrfd::ScrfdLocator;
use crate::error::{Result, VisionError};
use futures::FutureExt;
use futures::future::BoxFuture;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::info;

/// The principal face found in an image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FaceRegion {
    #[serde(rename = "box")]
    pub face_box: Rect,
    pub confidence: f32,
}

/// Finds the single most prominent face in an image.
pub trait FaceLocator: Send + Sync {
    /// Returns `VisionError::NoFaceDetected` when nothing usable is found.
    fn locate_face(&self, image: &RgbImage) -> Result<FaceRegion>;
}

pub type SharedLocator = Arc<dyn FaceLocator>;
type LoaderFn = dyn Fn() -> BoxFuture<'static, Result<SharedLocator>> + Send + Sync;

/// A face locator whose model is loaded on first use and cached afterwards.
pub struct LazyFaceLocator {
    cell: OnceCell<SharedLocator>,
    loader: Box<LoaderFn>,
}

impl LazyFaceLocator {
    pub fn new<F>(loader: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<SharedLocator>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceCell::new(),
            loader: Box::new(loader),
        }
    }

    /// Wraps a locator that is already in memory.
    pub fn ready(locator: SharedLocator) -> Self {
        Self {
            cell: OnceCell::new_with(Some(locator)),
            loader: Box::new(|| {
                async {
                    Err::<SharedLocator, _>(VisionError::ModelLoad(
                        "preloaded locator has no loader".to_string(),
                    ))
                }
                .boxed()
            }),
        }
    }

    /// Loads an SCRFD model from `config.model_path` on first use.
    pub fn from_config(config: &AnalyzerConfig) -> Self {
        let model_path = config.model_path.clone();
        let threshold = config.detection_threshold();
        Self::new(move || {
            let model_path: PathBuf = model_path.clone();
            async move {
                let bytes = tokio::fs::read(&model_path).await.map_err(|err| {
                    VisionError::ModelLoad(format!("{}: {}", model_path.display(), err))
                })?;
                let locator = tokio::task::spawn_blocking(move || {
                    ScrfdLocator::from_bytes(&bytes, threshold)
                })
                .await
                .map_err(|err| VisionError::ModelLoad(err.to_string()))??;
                info!(path = %model_path.display(), "face detection model loaded");
                Ok(Arc::new(locator) as SharedLocator)
            }
            .boxed()
        })
    }

    /// The loaded model, loading it first if this is the first call.
    pub async fn get(&self) -> Result<SharedLocator> {
        self.cell
            .get_or_try_init(|| (self.loader)())
            .await
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

static GLOBAL_LOCATOR: OnceLock<Arc<LazyFaceLocator>> = OnceLock::new();

/// The process-wide locator. The configuration of the first call wins; later calls
/// share that instance regardless of the configuration they pass.
pub fn global_face_locator(config: &AnalyzerConfig) -> Arc<LazyFaceLocator> {
    GLOBAL_LOCATOR
        .get_or_init(|| Arc::new(LazyFaceLocator::from_config(config)))
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct FixedLocator(FaceRegion);

    impl FaceLocator for FixedLocator {
        fn locate_face(&self, _image: &RgbImage) -> Result<FaceRegion> {
            Ok(self.0)
        }
    }

    fn fixed() -> SharedLocator {
        Arc::new(FixedLocator(FaceRegion {
            face_box: Rect::new(1, 2, 3, 4),
            confidence: 0.9,
        }))
    }

    fn counting_loader(loads: Arc<AtomicUsize>) -> LazyFaceLocator {
        LazyFaceLocator::new(move || {
            let loads = loads.clone();
            async move {
                loads.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(fixed())
            }
            .boxed()
        })
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_load() {
        let loads = Arc::new(AtomicUsize::new(0));
        let lazy = counting_loader(loads.clone());
        assert!(!lazy.is_loaded());

        let (first, second) = tokio::join!(lazy.get(), lazy.get());
        assert!(first.is_ok());
        assert!(second.is_ok());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(lazy.is_loaded());

        lazy.get().await.unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_load_is_not_cached() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let lazy = LazyFaceLocator::new(move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(VisionError::ModelLoad("weights unreachable".into()))
                } else {
                    Ok(fixed())
                }
            }
            .boxed()
        });

        assert!(matches!(lazy.get().await, Err(VisionError::ModelLoad(_))));
        assert!(!lazy.is_loaded());
        assert!(lazy.get().await.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ready_locator_never_loads() {
        let lazy = LazyFaceLocator::ready(fixed());
        assert!(lazy.is_loaded());
        let locator = lazy.get().await.unwrap();
        let region = locator.locate_face(&RgbImage::new(4, 4)).unwrap();
        assert_eq!(region.face_box, Rect::new(1, 2, 3, 4));
    }

    #[tokio::test]
    async fn missing_model_file_is_a_load_error() {
        let config = AnalyzerConfig {
            model_path: "definitely/not/here.onnx".into(),
            ..AnalyzerConfig::default()
        };
        let lazy = LazyFaceLocator::from_config(&config);
        assert!(matches!(lazy.get().await, Err(VisionError::ModelLoad(_))));
    }

    #[test]
    fn face_region_serializes_box_key() {
        let json = serde_json::to_value(FaceRegion {
            face_box: Rect::new(1, 2, 3, 4),
            confidence: 0.5,
        })
        .unwrap();
        assert_eq!(json["box"]["width"], 3);
    }
}
