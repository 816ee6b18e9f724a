pub mod classes;
pub mod merge;
pub mod steps;
pub mod yolo;

use std::path::PathBuf;
use std::sync::Arc;

use image::{DynamicImage, GenericImageView};

use crate::geometry::BoundingBox;
use crate::label::Prediction;
use crate::pipeline::Pipeline;

pub use classes::load_class_names;
pub use yolo::{RtenDetector, YoloParams};

/// A detected object in pixel coordinates of the image handed to the detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub class_id: u32,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn shifted(mut self, dx: f32, dy: f32) -> Self {
        self.bbox.x += dx;
        self.bbox.y += dy;
        self
    }

    /// Normalize against an `img_w` x `img_h` image
    pub fn to_prediction(&self, img_w: u32, img_h: u32) -> Prediction {
        Prediction {
            label: self.bbox.clamp_to(img_w, img_h).to_label(self.class_id, img_w, img_h),
            confidence: self.confidence,
        }
    }
}

/// Object detector run on whole images or tiles
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>>;

    /// Class names indexed by class id, empty when unknown
    fn class_names(&self) -> &[String] {
        &[]
    }
}

/// How an image is cut into overlapping tiles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceParams {
    pub slice_width: u32,
    pub slice_height: u32,
    pub overlap_width_ratio: f32,
    pub overlap_height_ratio: f32,
    /// Also run the detector on the whole image
    pub include_full_image: bool,
}

impl Default for SliceParams {
    fn default() -> Self {
        Self {
            slice_width: 640,
            slice_height: 640,
            overlap_width_ratio: 0.2,
            overlap_height_ratio: 0.2,
            include_full_image: true,
        }
    }
}

/// Runs a detector over overlapping tiles and merges the results
pub struct SlicedPredictor {
    detector: Arc<dyn Detector>,
    pipeline: Pipeline,
    merge_threshold: f32,
}

impl SlicedPredictor {
    pub fn new(detector: Arc<dyn Detector>, params: SliceParams) -> Self {
        Self {
            pipeline: build_sliced_pipeline(detector.clone(), params),
            detector,
            merge_threshold: merge::DEFAULT_MERGE_THRESHOLD,
        }
    }

    /// Save every tile under `dir` for inspection
    pub fn with_debug(mut self, dir: Option<PathBuf>) -> anyhow::Result<Self> {
        self.pipeline = self.pipeline.with_optional_debug(dir)?;
        Ok(self)
    }

    pub fn with_merge_threshold(mut self, threshold: f32) -> Self {
        self.merge_threshold = threshold;
        self
    }

    pub fn class_names(&self) -> &[String] {
        self.detector.class_names()
    }

    /// Predict YOLO labels for `image`; `name` only labels debug output
    pub fn predict(&self, name: &str, image: &DynamicImage) -> anyhow::Result<Vec<Prediction>> {
        let (width, height) = image.dimensions();
        let views = self.pipeline.run_named(name, image.clone())?;
        let detections: Vec<Detection> = views.into_iter().flat_map(|v| v.detections).collect();
        let raw = detections.len();
        let merged = merge::merge_detections(detections, self.merge_threshold);
        log::debug!("{}: {} detections merged into {}", name, raw, merged.len());

        Ok(merged
            .iter()
            .map(|d| d.to_prediction(width, height))
            .collect())
    }
}

/// Build the slice → detect pipeline
pub fn build_sliced_pipeline(detector: Arc<dyn Detector>, params: SliceParams) -> Pipeline {
    use steps::{DetectStep, SliceStep};

    Pipeline::new()
        .add_step(Arc::new(SliceStep { params }))
        .add_step(Arc::new(DetectStep { detector }))
}
