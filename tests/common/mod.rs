mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from annotation_corrector for tests
pub use annotation_corrector::{
    BoundingBox, Config, Detection, Detector, Prediction, ReviewSession, SliceParams,
    SlicedPredictor, YoloLabel,
};
