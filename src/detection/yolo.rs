use std::path::Path;

use anyhow::Context;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use rten::Model;
use rten_tensor::NdTensor;
use rten_tensor::prelude::*;

use super::{Detection, Detector, merge};
use crate::geometry::BoundingBox;

/// Grey level used to pad letterboxed input
const PAD_VALUE: f32 = 114.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloParams {
    /// Side of the square model input
    pub input_size: u32,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            input_size: 640,
            confidence_threshold: 0.3,
            iou_threshold: 0.45,
        }
    }
}

/// Scale and padding applied when fitting an image into the model input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let new_w = (width as f32 * scale).round();
        let new_h = (height as f32 * scale).round();
        Self {
            scale,
            pad_x: ((size as f32 - new_w) / 2.0).floor(),
            pad_y: ((size as f32 - new_h) / 2.0).floor(),
        }
    }

    /// Map a box from model input coordinates back to the source image
    pub fn undo(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x - self.pad_x) / self.scale,
            (bbox.y - self.pad_y) / self.scale,
            bbox.width / self.scale,
            bbox.height / self.scale,
        )
    }
}

/// YOLOv8-style detector running an `.rten` model
pub struct RtenDetector {
    model: Model,
    params: YoloParams,
    class_names: Vec<String>,
}

impl RtenDetector {
    pub fn load(path: &Path, params: YoloParams) -> anyhow::Result<Self> {
        let model = Model::load_file(path)
            .with_context(|| format!("Failed to load model {}", path.display()))?;
        log::info!("Loaded model {}", path.display());
        Ok(Self {
            model,
            params,
            class_names: Vec::new(),
        })
    }

    pub fn with_class_names(mut self, class_names: Vec<String>) -> Self {
        self.class_names = class_names;
        self
    }

    /// NCHW float input in `[0, 1]`, letterboxed to the model input size
    fn prepare_input(&self, image: &DynamicImage) -> (NdTensor<f32, 4>, Letterbox) {
        let size = self.params.input_size;
        let (width, height) = image.dimensions();
        let letterbox = Letterbox::fit(width, height, size);

        let new_w = ((width as f32 * letterbox.scale).round() as u32).clamp(1, size);
        let new_h = ((height as f32 * letterbox.scale).round() as u32).clamp(1, size);
        let resized = image::imageops::resize(&image.to_rgb8(), new_w, new_h, FilterType::Triangle);

        let size = size as usize;
        let mut input = NdTensor::full([1, 3, size, size], PAD_VALUE);
        let (pad_x, pad_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                input[[0, c, y as usize + pad_y, x as usize + pad_x]] = pixel[c] as f32 / 255.0;
            }
        }

        (input, letterbox)
    }
}

/// Decode a `[1, 4 + classes, anchors]` YOLOv8 output.
///
/// Each anchor holds centre-x, centre-y, width, height followed by one score
/// per class. Outputs exported as `[1, anchors, 4 + classes]` are accepted
/// too.
pub fn decode_output(output: &NdTensor<f32, 3>, confidence_threshold: f32) -> Vec<Detection> {
    let [_, rows, cols] = output.shape();
    let transposed = rows > cols;
    let (channels, anchors) = if transposed { (cols, rows) } else { (rows, cols) };
    if channels <= 4 {
        return Vec::new();
    }

    let value = |channel: usize, anchor: usize| -> f32 {
        if transposed {
            output[[0, anchor, channel]]
        } else {
            output[[0, channel, anchor]]
        }
    };

    let mut detections = Vec::new();
    for anchor in 0..anchors {
        let (class_id, confidence) = (4..channels)
            .map(|c| (c - 4, value(c, anchor)))
            .fold((0, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
        if confidence < confidence_threshold {
            continue;
        }

        let (cx, cy) = (value(0, anchor), value(1, anchor));
        let (w, h) = (value(2, anchor), value(3, anchor));
        detections.push(Detection {
            class_id: class_id as u32,
            confidence,
            bbox: BoundingBox::new(cx - w / 2.0, cy - h / 2.0, w, h),
        });
    }
    detections
}

impl Detector for RtenDetector {
    fn detect(&self, image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        let (input, letterbox) = self.prepare_input(image);
        let output = self.model.run_one(input.view().into(), None)?;
        let output: NdTensor<f32, 3> = output.try_into()?;

        let candidates = decode_output(&output, self.params.confidence_threshold)
            .into_iter()
            .map(|d| Detection {
                bbox: letterbox.undo(d.bbox),
                ..d
            })
            .collect();
        Ok(merge::nms(candidates, self.params.iou_threshold))
    }

    fn class_names(&self) -> &[String] {
        &self.class_names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn letterbox_centres_wide_image() {
        let lb = Letterbox::fit(1280, 640, 640);
        assert_abs_diff_eq!(lb.scale, 0.5);
        assert_abs_diff_eq!(lb.pad_x, 0.0);
        assert_abs_diff_eq!(lb.pad_y, 160.0);

        let back = lb.undo(BoundingBox::new(10.0, 170.0, 20.0, 40.0));
        assert_eq!(back, BoundingBox::new(20.0, 20.0, 40.0, 80.0));
    }

    #[test]
    fn decodes_channel_major_output() {
        // 2 classes, 8 anchors
        let mut output = NdTensor::zeros([1, 6, 8]);
        for (c, v) in [50.0, 60.0, 20.0, 10.0, 0.1, 0.9].into_iter().enumerate() {
            output[[0, c, 1]] = v;
        }
        output[[0, 4, 2]] = 0.2;

        let detections = decode_output(&output, 0.3);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 1);
        assert_abs_diff_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].bbox, BoundingBox::new(40.0, 55.0, 20.0, 10.0));
    }

    #[test]
    fn decodes_anchor_major_output() {
        let mut output = NdTensor::zeros([1, 8, 5]);
        for (c, v) in [50.0, 60.0, 20.0, 10.0, 0.7].into_iter().enumerate() {
            output[[0, 3, c]] = v;
        }
        let detections = decode_output(&output, 0.3);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 0);
    }
}
