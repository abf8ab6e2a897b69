// THEORY:
// `ScrfdLocator` is the default `FaceLocator` backend: an SCRFD face detector in ONNX
// form, executed on the CPU with tract. It is treated as a black box that turns an
// RGB image into scored face boxes; no part of the salon pipeline depends on its
// internals.
//
// Pipeline:
// 1.  **Letterbox**: the image is resized (aspect preserved) into the top-left of a
//     640x640 canvas and normalized to (v - 127.5) / 128, channel-first.
// 2.  **Decode**: for each of the three feature strides (8, 16, 32) the model emits
//     per-anchor scores and box distances. Each grid cell carries two anchors centered
//     on the cell origin; a box is (cx - d0, cy - d1, cx + d2, cy + d3) in stride
//     units.
// 3.  **Suppress**: candidates below the score threshold are dropped, the rest go
//     through greedy non-maximum suppression.
// 4.  **Pick**: `locate_face` keeps the highest scoring face and clamps it to the
//     image. A box that clamps to nothing counts as no face at all.

use crate::core_modules::face_locator::{FaceLocator, FaceRegion};
use crate::core_modules::pixel_buffer::Rect;
use crate::error::{Result, VisionError};
use image::RgbImage;
use image::imageops::{self, FilterType};
use std::io;
use tract_onnx::prelude::tract_ndarray::Array4;
use tract_onnx::prelude::*;
use tracing::debug;

type Model = RunnableModel<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

const INPUT_SIZE: usize = 640;
const CHANNELS: usize = 3;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub score: f32,
    pub iou: f32,
}

impl Default for Threshold {
    fn default() -> Self {
        Self {
            score: 0.4,
            iou: 0.5,
        }
    }
}

/// A scored face box in source-image pixel coordinates (corners, not yet clamped).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub score: f32,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Detection {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let width = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let height = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }

    /// Clamps the box to a `width` x `height` image.
    pub fn to_rect(&self, width: u32, height: u32) -> Rect {
        let x1 = self.x1.clamp(0.0, width as f32);
        let y1 = self.y1.clamp(0.0, height as f32);
        let x2 = self.x2.clamp(0.0, width as f32);
        let y2 = self.y2.clamp(0.0, height as f32);
        let x = x1.floor() as u32;
        let y = y1.floor() as u32;
        Rect::new(
            x,
            y,
            (x2.ceil() as u32).saturating_sub(x),
            (y2.ceil() as u32).saturating_sub(y),
        )
        .clamp_to(width, height)
    }
}

pub struct ScrfdLocator {
    model: Model,
    threshold: Threshold,
}

impl ScrfdLocator {
    pub fn from_bytes(model_bytes: &[u8], threshold: Threshold) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut io::BufReader::new(model_bytes))
            .and_then(|model| {
                model.with_input_fact(
                    0,
                    f32::fact([1, CHANNELS, INPUT_SIZE, INPUT_SIZE]).into(),
                )
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|err| VisionError::ModelLoad(err.to_string()))?;

        let outputs = model
            .model()
            .output_outlets()
            .map_err(|err| VisionError::ModelLoad(err.to_string()))?
            .len();
        if outputs != STRIDES.len() * 3 {
            return Err(VisionError::ModelLoad(format!(
                "unsupported SCRFD variant with {} outputs",
                outputs
            )));
        }

        Ok(Self { model, threshold })
    }

    /// All faces above the score threshold after non-maximum suppression, best first.
    pub fn detect(&self, image: &RgbImage) -> Result<Vec<Detection>> {
        if image.width() == 0 || image.height() == 0 {
            return Err(VisionError::InvalidInput("image has no pixels".to_string()));
        }
        let (scale, blob) = letterbox(image);
        let outputs = self
            .model
            .run(tvec!(Tensor::from(blob).into()))
            .map_err(|err| VisionError::Analysis(err.to_string()))?;

        let mut candidates = Vec::new();
        for (level, &stride) in STRIDES.iter().enumerate() {
            let scores = flatten(&outputs[level])?;
            let distances = flatten(&outputs[level + STRIDES.len()])?;
            candidates.extend(decode_level(
                &scores,
                &distances,
                stride,
                self.threshold.score,
                scale,
            )?);
        }

        let faces = non_max_suppression(candidates, self.threshold.iou);
        debug!(faces = faces.len(), "scrfd detection finished");
        Ok(faces)
    }
}

impl FaceLocator for ScrfdLocator {
    fn locate_face(&self, image: &RgbImage) -> Result<FaceRegion> {
        let faces = self.detect(image)?;
        best_face(&faces, image.width(), image.height())
    }
}

/// The highest scoring detection as a clamped face region.
pub fn best_face(faces: &[Detection], width: u32, height: u32) -> Result<FaceRegion> {
    let best = faces
        .iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or(VisionError::NoFaceDetected)?;
    let face_box = best.to_rect(width, height);
    if face_box.is_empty() {
        return Err(VisionError::NoFaceDetected);
    }
    Ok(FaceRegion {
        face_box,
        confidence: best.score.clamp(0.0, 1.0),
    })
}

fn flatten(value: &TValue) -> Result<Vec<f32>> {
    let view = value
        .to_array_view::<f32>()
        .map_err(|err| VisionError::Analysis(err.to_string()))?;
    Ok(view.iter().copied().collect())
}

/// Anchor centers for one stride, row-major with `ANCHORS_PER_CELL` repeats per cell.
fn anchor_centers(stride: usize) -> Vec<(f32, f32)> {
    let cells = INPUT_SIZE / stride;
    let mut centers = Vec::with_capacity(cells * cells * ANCHORS_PER_CELL);
    for y in 0..cells {
        for x in 0..cells {
            for _ in 0..ANCHORS_PER_CELL {
                centers.push(((x * stride) as f32, (y * stride) as f32));
            }
        }
    }
    centers
}

fn decode_level(
    scores: &[f32],
    distances: &[f32],
    stride: usize,
    score_threshold: f32,
    scale: f32,
) -> Result<Vec<Detection>> {
    let centers = anchor_centers(stride);
    if scores.len() != centers.len() || distances.len() != centers.len() * 4 {
        return Err(VisionError::Analysis(format!(
            "unexpected SCRFD output size at stride {}: {} scores, {} distances",
            stride,
            scores.len(),
            distances.len()
        )));
    }

    let stride = stride as f32;
    let detections = centers
        .iter()
        .zip(scores)
        .zip(distances.chunks_exact(4))
        .filter(|((_, score), _)| **score >= score_threshold)
        .map(|(((cx, cy), score), d)| Detection {
            score: *score,
            x1: (cx - d[0] * stride) * scale,
            y1: (cy - d[1] * stride) * scale,
            x2: (cx + d[2] * stride) * scale,
            y2: (cy + d[3] * stride) * scale,
        })
        .collect();
    Ok(detections)
}

/// Greedy NMS: keep the best box, drop everything overlapping it above `iou`, repeat.
pub fn non_max_suppression(mut candidates: Vec<Detection>, iou: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|face| face.iou(&candidate) <= iou) {
            kept.push(candidate);
        }
    }
    kept
}

/// Resizes into the top-left of the square model input. Returns the factor that maps
/// model coordinates back onto the source image.
fn letterbox(image: &RgbImage) -> (f32, Array4<f32>) {
    let (new_width, new_height) = letterbox_size(image.width(), image.height());
    let scale = image.height() as f32 / new_height as f32;

    let mut canvas = RgbImage::new(INPUT_SIZE as u32, INPUT_SIZE as u32);
    let resized = imageops::resize(image, new_width, new_height, FilterType::Triangle);
    imageops::overlay(&mut canvas, &resized, 0, 0);

    let blob = Array4::from_shape_fn((1, CHANNELS, INPUT_SIZE, INPUT_SIZE), |(_, c, y, x)| {
        (canvas.get_pixel(x as u32, y as u32)[c] as f32 - PIXEL_MEAN) / PIXEL_STD
    });
    (scale, blob)
}

fn letterbox_size(width: u32, height: u32) -> (u32, u32) {
    let input = INPUT_SIZE as u64;
    let (width, height) = (width as u64, height as u64);
    if height > width {
        ((width * input / height).max(1) as u32, input as u32)
    } else {
        (input as u32, (height * input / width).max(1) as u32)
    }
}
