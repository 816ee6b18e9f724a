//! Building a review session from image, label and prediction directories.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, ImageReader};

use crate::detection::merge::DEFAULT_MERGE_THRESHOLD;
use crate::detection::{
    RtenDetector, SliceParams, SlicedPredictor, YoloParams, load_class_names,
};
use crate::label::{self, Prediction, YoloLabel};
use crate::review::{ReviewItem, ReviewSession};

/// Subdirectory of the corrected directory holding cached predictions
pub const PREDICTIONS_DIR: &str = "predicted_labels";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Clone)]
pub struct Config {
    pub images: PathBuf,
    /// Original ground truth labels
    pub labels: PathBuf,
    /// Where corrected labels are written
    pub corrected: PathBuf,
    pub model: PathBuf,
    /// Reuse predictions cached by an earlier run instead of running the model
    pub use_cached_predictions: bool,
    pub classes: Option<PathBuf>,
    pub yolo: YoloParams,
    pub slicing: SliceParams,
    /// IoS above which overlapping tile detections are merged
    pub merge_threshold: f32,
    pub debug_out: Option<PathBuf>,
}

impl Config {
    pub fn new(images: PathBuf, labels: PathBuf, corrected: PathBuf, model: PathBuf) -> Self {
        Self {
            images,
            labels,
            corrected,
            model,
            use_cached_predictions: false,
            classes: None,
            yolo: YoloParams::default(),
            slicing: SliceParams::default(),
            merge_threshold: DEFAULT_MERGE_THRESHOLD,
            debug_out: None,
        }
    }

    pub fn predictions_dir(&self) -> PathBuf {
        self.corrected.join(PREDICTIONS_DIR)
    }
}

/// Load the model named in `config` and wrap it for sliced prediction
pub fn load_predictor(config: &Config) -> anyhow::Result<SlicedPredictor> {
    let class_names = match &config.classes {
        Some(path) => load_class_names(path)?,
        None => Vec::new(),
    };
    let detector = RtenDetector::load(&config.model, config.yolo)?.with_class_names(class_names);
    SlicedPredictor::new(Arc::new(detector), config.slicing)
        .with_merge_threshold(config.merge_threshold)
        .with_debug(config.debug_out.clone())
}

/// Copy label files into `corrected`, never replacing a file already there.
///
/// Returns how many files were copied. Failures are logged and skipped.
pub fn copy_missing_labels(labels: &Path, corrected: &Path) -> anyhow::Result<usize> {
    std::fs::create_dir_all(corrected)
        .with_context(|| format!("Failed to create {}", corrected.display()))?;

    let mut copied = 0;
    for src in glob_in(labels, "*.txt")? {
        let Some(name) = src.file_name() else { continue };
        let dst = corrected.join(name);
        if dst.exists() {
            continue;
        }
        match std::fs::copy(&src, &dst) {
            Ok(_) => copied += 1,
            Err(e) => log::error!("Failed to copy {} to {}: {}", src.display(), dst.display(), e),
        }
    }
    log::debug!("Copied {} label files into {}", copied, corrected.display());
    Ok(copied)
}

fn glob_in(dir: &Path, pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let dir = dir
        .to_str()
        .with_context(|| format!("Path is not valid UTF-8: {}", dir.display()))?;
    let pattern = format!("{}/{}", glob::Pattern::escape(dir), pattern);
    Ok(glob::glob(&pattern)?.filter_map(Result::ok).collect())
}

/// Images in `dir` with a known extension, sorted by path
pub fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut images: Vec<PathBuf> = glob_in(dir, "*")?
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        })
        .collect();
    images.sort();
    Ok(images)
}

fn open_image(path: &Path) -> anyhow::Result<DynamicImage> {
    let img = ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
    Ok(DynamicImage::ImageRgb8(img.to_rgb8()))
}

/// Prepare the session: sync label files, obtain predictions and keep only
/// images where predictions and ground truth disagree.
///
/// `load` is only called when predictions have to be computed.
pub fn prepare_session<F>(config: &Config, load: F) -> anyhow::Result<ReviewSession>
where
    F: FnOnce(&Config) -> anyhow::Result<SlicedPredictor>,
{
    copy_missing_labels(&config.labels, &config.corrected)?;

    let pred_dir = config.predictions_dir();
    std::fs::create_dir_all(&pred_dir)
        .with_context(|| format!("Failed to create {}", pred_dir.display()))?;

    let predictor = if config.use_cached_predictions {
        None
    } else {
        Some(load(config)?)
    };

    let class_names = match (&config.classes, &predictor) {
        (Some(path), _) => load_class_names(path)?,
        (None, Some(p)) => p.class_names().to_vec(),
        (None, None) => Vec::new(),
    };

    let image_paths = list_images(&config.images)?;
    let total = image_paths.len();
    let mut items = Vec::new();

    for (idx, img_path) in image_paths.into_iter().enumerate() {
        log::info!("[{}/{}] Processing {}", idx + 1, total, img_path.display());

        let image = match open_image(&img_path) {
            Ok(image) => image,
            Err(e) => {
                log::error!("Failed to open image {}: {:#}", img_path.display(), e);
                continue;
            }
        };

        let label_file = label::label_file_for(&config.corrected, &img_path);
        let sourced = match label::read_label_lines(&label_file) {
            Ok(sourced) => sourced,
            Err(e) => {
                log::error!("Skipping {}: {:#}", img_path.display(), e);
                continue;
            }
        };

        let pred_file = label::label_file_for(&pred_dir, &img_path);
        let predictions: Vec<Prediction> = match &predictor {
            None => match label::read_predictions(&pred_file) {
                Ok(predictions) => predictions,
                Err(e) => {
                    log::error!("Skipping {}: {:#}", img_path.display(), e);
                    continue;
                }
            },
            Some(predictor) => {
                let name = img_path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let predictions = predictor.predict(&name, &image)?;
                label::write_predictions(&pred_file, &predictions)?;
                predictions
            }
        };

        let labels: Vec<YoloLabel> = sourced.iter().map(|(l, _)| *l).collect();
        if label::same_label_set(&predictions, &labels) {
            log::debug!("{}: predictions agree with labels", img_path.display());
            continue;
        }

        items.push(ReviewItem::new(img_path, image, label_file, predictions, sourced));
    }

    log::info!("{} of {} images need review", items.len(), total);
    Ok(ReviewSession { items, class_names })
}
