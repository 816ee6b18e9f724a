//! Combining overlapping detections.
//!
//! Tiles overlap, so one object is often found twice: once per tile, and
//! again on the full-image pass. [`merge_detections`] folds those copies
//! into one box. [`nms`] is the plain suppression used when decoding a
//! single model output.

use std::cmp::Ordering;

use super::Detection;

/// IoS above which two same-class detections are considered the same object
pub const DEFAULT_MERGE_THRESHOLD: f32 = 0.5;

fn by_confidence(a: &Detection, b: &Detection) -> Ordering {
    b.confidence
        .partial_cmp(&a.confidence)
        .unwrap_or(Ordering::Equal)
}

/// Class-aware non-maximum suppression by IoU
pub fn nms(mut detections: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    detections.sort_by(by_confidence);

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Greedy non-maximum merging by intersection over smaller area.
///
/// Highest confidence first, each surviving detection absorbs every
/// remaining same-class detection overlapping it by more than
/// `ios_threshold`. The survivor's box grows to the union of the absorbed
/// boxes and keeps its own (highest) confidence.
pub fn merge_detections(mut detections: Vec<Detection>, ios_threshold: f32) -> Vec<Detection> {
    detections.sort_by(by_confidence);

    let mut consumed = vec![false; detections.len()];
    let mut merged = Vec::new();

    for i in 0..detections.len() {
        if consumed[i] {
            continue;
        }
        consumed[i] = true;
        let anchor = detections[i];
        let mut bbox = anchor.bbox;

        for j in (i + 1)..detections.len() {
            if consumed[j] || detections[j].class_id != anchor.class_id {
                continue;
            }
            if anchor.bbox.ios(&detections[j].bbox) > ios_threshold {
                bbox = bbox.union(&detections[j].bbox);
                consumed[j] = true;
            }
        }

        merged.push(Detection { bbox, ..anchor });
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;

    fn det(class_id: u32, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection {
            class_id,
            confidence,
            bbox: BoundingBox::new(x, y, w, h),
        }
    }

    #[test]
    fn nms_keeps_best_of_overlapping_same_class() {
        let kept = nms(
            vec![
                det(0, 0.6, 1.0, 1.0, 10.0, 10.0),
                det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
                det(1, 0.5, 0.0, 0.0, 10.0, 10.0),
                det(0, 0.4, 50.0, 50.0, 10.0, 10.0),
            ],
            0.45,
        );
        let confidences: Vec<f32> = kept.iter().map(|d| d.confidence).collect();
        assert_eq!(confidences, vec![0.9, 0.5, 0.4]);
    }

    #[test]
    fn merge_joins_box_split_across_tiles() {
        // one object cut by a tile border, plus the full-image detection
        let merged = merge_detections(
            vec![
                det(3, 0.7, 100.0, 100.0, 40.0, 20.0),
                det(3, 0.8, 100.0, 100.0, 30.0, 20.0),
                det(3, 0.6, 115.0, 100.0, 20.0, 20.0),
            ],
            DEFAULT_MERGE_THRESHOLD,
        );
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.8);
        assert_eq!(merged[0].bbox, BoundingBox::new(100.0, 100.0, 40.0, 20.0));
    }

    #[test]
    fn merge_keeps_other_classes_apart() {
        let merged = merge_detections(
            vec![
                det(0, 0.9, 0.0, 0.0, 10.0, 10.0),
                det(1, 0.8, 0.0, 0.0, 10.0, 10.0),
            ],
            DEFAULT_MERGE_THRESHOLD,
        );
        assert_eq!(merged.len(), 2);
    }
}
