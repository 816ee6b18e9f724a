use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use annotation_corrector::{BoundingBox, Config, Detection, Detector, SliceParams, SlicedPredictor};
use image::{DynamicImage, ImageBuffer, Rgb};
use tempfile::TempDir;

/// Images, labels and corrected directories under one temp directory.
/// The directory is removed when dropped.
pub struct TestDataset {
    pub dir: TempDir,
    pub images: PathBuf,
    pub labels: PathBuf,
    pub corrected: PathBuf,
}

impl TestDataset {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let images = dir.path().join("images");
        let labels = dir.path().join("labels");
        let corrected = dir.path().join("corrected");
        std::fs::create_dir_all(&images).expect("Failed to create images dir");
        std::fs::create_dir_all(&labels).expect("Failed to create labels dir");
        Self {
            dir,
            images,
            labels,
            corrected,
        }
    }

    /// Config pointing at this dataset; the model path does not exist
    pub fn config(&self) -> Config {
        Config::new(
            self.images.clone(),
            self.labels.clone(),
            self.corrected.clone(),
            self.dir.path().join("model.rten"),
        )
    }

    /// Writes a gray `width` x `height` PNG named `{stem}.png`
    pub fn add_image(&self, stem: &str, width: u32, height: u32) -> PathBuf {
        let img = ImageBuffer::from_fn(width, height, |_, _| Rgb([128u8, 128u8, 128u8]));
        let path = self.images.join(format!("{stem}.png"));
        img.save_with_format(&path, image::ImageFormat::Png)
            .expect("Failed to save test image");
        path
    }

    pub fn add_label(&self, stem: &str, content: &str) -> PathBuf {
        write_file(&self.labels.join(format!("{stem}.txt")), content)
    }

    pub fn add_cached_prediction(&self, stem: &str, content: &str) -> PathBuf {
        let dir = self.corrected.join("predicted_labels");
        std::fs::create_dir_all(&dir).expect("Failed to create predictions dir");
        write_file(&dir.join(format!("{stem}.txt")), content)
    }

    pub fn corrected_label(&self, stem: &str) -> String {
        std::fs::read_to_string(self.corrected.join(format!("{stem}.txt")))
            .expect("Failed to read corrected label")
    }
}

pub fn write_file(path: &Path, content: &str) -> PathBuf {
    std::fs::write(path, content).expect("Failed to write file");
    path.to_path_buf()
}

/// Detector returning the same detections for every image, counting calls
pub struct StubDetector {
    pub detections: Vec<Detection>,
    pub calls: AtomicUsize,
    pub names: Vec<String>,
}

impl StubDetector {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self {
            detections,
            calls: AtomicUsize::new(0),
            names: vec!["car".to_string(), "person".to_string()],
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Detector for StubDetector {
    fn detect(&self, _image: &DynamicImage) -> anyhow::Result<Vec<Detection>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.detections.clone())
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}

pub fn detection(class_id: u32, confidence: f32, x: f32, y: f32, w: f32, h: f32) -> Detection {
    Detection {
        class_id,
        confidence,
        bbox: BoundingBox::new(x, y, w, h),
    }
}

pub fn stub_predictor(detector: Arc<StubDetector>) -> SlicedPredictor {
    SlicedPredictor::new(detector, SliceParams::default())
}
