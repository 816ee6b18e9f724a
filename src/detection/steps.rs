use crate::detection::{Detector, SliceParams};
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep, Region};
use anyhow::Result;
use image::GenericImageView;
use std::sync::Arc;

/// Tiles covering a `width` x `height` image.
///
/// Tiles advance by the slice size minus the overlap; tiles that would run
/// past the border are shifted back so they end on it.
pub fn slice_regions(width: u32, height: u32, params: &SliceParams) -> Vec<Region> {
    let mut regions = Vec::new();
    if width == 0 || height == 0 {
        return regions;
    }

    let slice_w = params.slice_width.max(1);
    let slice_h = params.slice_height.max(1);
    let overlap_x = ((params.overlap_width_ratio * slice_w as f32) as u32).min(slice_w - 1);
    let overlap_y = ((params.overlap_height_ratio * slice_h as f32) as u32).min(slice_h - 1);

    let mut y_min = 0;
    let mut y_max = 0;
    while y_max < height {
        y_max = y_min + slice_h;
        let mut x_min = 0;
        let mut x_max = 0;
        while x_max < width {
            x_max = x_min + slice_w;
            let x_end = x_max.min(width);
            let y_end = y_max.min(height);
            let x_start = x_end.saturating_sub(slice_w);
            let y_start = y_end.saturating_sub(slice_h);
            regions.push(Region {
                x: x_start,
                y: y_start,
                width: x_end - x_start,
                height: y_end - y_start,
            });
            x_min = x_max - overlap_x;
        }
        y_min = y_max - overlap_y;
    }

    regions
}

/// Split each image into overlapping tiles
pub struct SliceStep {
    pub params: SliceParams,
}

impl PipelineStep for SliceStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::new();

        for item in data {
            let (width, height) = item.image.dimensions();
            let regions = slice_regions(width, height, &self.params);
            let (off_x, off_y) = item.offset();

            // A single tile already is the whole image
            if self.params.include_full_image && regions.len() > 1 {
                result.push(item.clone());
            }

            for region in regions {
                let cropped = item.image.crop_imm(region.x, region.y, region.width, region.height);
                let absolute = Region {
                    x: region.x + off_x,
                    y: region.y + off_y,
                    ..region
                };
                result.push(PipelineData::from_region(cropped, absolute));
            }
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Slicing"
    }
}

/// Run the detector on each view and move results into original coordinates
pub struct DetectStep {
    pub detector: Arc<dyn Detector>,
}

impl PipelineStep for DetectStep {
    fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
        let mut result = Vec::with_capacity(data.len());

        for mut item in data {
            let (off_x, off_y) = item.offset();
            let found = self.detector.detect(&item.image)?;
            item.detections
                .extend(found.into_iter().map(|d| d.shifted(off_x as f32, off_y as f32)));
            result.push(item);
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "Detection"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: u32) -> SliceParams {
        SliceParams {
            slice_width: size,
            slice_height: size,
            ..SliceParams::default()
        }
    }

    #[test]
    fn small_image_is_a_single_tile() {
        let regions = slice_regions(300, 200, &params(640));
        assert_eq!(
            regions,
            vec![Region { x: 0, y: 0, width: 300, height: 200 }]
        );
    }

    #[test]
    fn last_tiles_end_on_the_border() {
        let regions = slice_regions(1000, 700, &params(640));
        let corners: Vec<(u32, u32)> = regions.iter().map(|r| (r.x, r.y)).collect();
        assert_eq!(corners, vec![(0, 0), (360, 0), (0, 60), (360, 60)]);
        assert!(regions.iter().all(|r| r.width == 640 && r.height == 640));
    }

    #[test]
    fn tiles_cover_every_pixel() {
        let (w, h) = (1500, 1300);
        let regions = slice_regions(w, h, &params(640));
        for y in (0..h).step_by(37) {
            for x in (0..w).step_by(37) {
                assert!(
                    regions
                        .iter()
                        .any(|r| x >= r.x && x < r.x + r.width && y >= r.y && y < r.y + r.height),
                    "({x}, {y}) not covered"
                );
            }
        }
    }

    #[test]
    fn empty_image_has_no_tiles() {
        assert!(slice_regions(0, 100, &params(640)).is_empty());
    }
}
