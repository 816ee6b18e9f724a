pub mod dataset;
pub mod detection;
pub mod enhance;
pub mod geometry;
pub mod label;
pub mod pipeline;
pub mod review;

pub use dataset::{Config, load_predictor, prepare_session};
pub use detection::{Detection, Detector, SliceParams, SlicedPredictor};
pub use geometry::{BoundingBox, Corner};
pub use label::{LabelError, Prediction, YoloLabel};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext, PipelineData, PipelineStep, Region};
pub use review::{ReviewItem, ReviewSession};

#[cfg(feature = "gui")]
pub mod gui;
