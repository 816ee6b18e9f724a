use clap::Parser;
use std::path::PathBuf;

use annotation_corrector::dataset::{self, Config};
use annotation_corrector::detection::YoloParams;
use annotation_corrector::SliceParams;

#[derive(Parser)]
#[command(name = "annotation-corrector")]
#[command(about = "Review YOLO labels where a detection model disagrees with them")]
struct Cli {
    /// Directory with the images
    #[arg(long, value_name = "DIR")]
    images: PathBuf,

    /// Directory with the original YOLO label files
    #[arg(long, value_name = "DIR")]
    labels: PathBuf,

    /// Directory for corrected labels (created if missing)
    #[arg(long, value_name = "DIR")]
    corrected: PathBuf,

    /// Path to the ONNX/rten detection model
    #[arg(long, value_name = "FILE")]
    model: PathBuf,

    /// Reuse predictions cached under <CORRECTED>/predicted_labels
    #[arg(long)]
    predictions: bool,

    /// Class names, one per line or a YOLO data.yaml
    #[arg(long, value_name = "FILE")]
    classes: Option<PathBuf>,

    /// Minimum detection confidence
    #[arg(long, default_value_t = 0.3)]
    confidence: f32,

    /// Slice size in pixels for sliced inference
    #[arg(long, default_value_t = 640)]
    slice_size: u32,

    /// Overlap ratio between neighbouring slices
    #[arg(long, default_value_t = 0.2)]
    overlap: f32,

    /// IoS above which overlapping detections from different slices merge
    #[arg(long, default_value_t = 0.5)]
    merge_threshold: f32,

    /// Save per-slice debug images to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.images, self.labels, self.corrected, self.model);
        config.use_cached_predictions = self.predictions;
        config.classes = self.classes;
        config.yolo = YoloParams {
            confidence_threshold: self.confidence,
            ..YoloParams::default()
        };
        config.slicing = SliceParams {
            slice_width: self.slice_size,
            slice_height: self.slice_size,
            overlap_width_ratio: self.overlap,
            overlap_height_ratio: self.overlap,
            ..SliceParams::default()
        };
        config.merge_threshold = self.merge_threshold;
        config.debug_out = self.debug_out;
        config
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = args.into_config();
    let session = dataset::prepare_session(&config, dataset::load_predictor)?;

    if session.is_empty() {
        log::info!("All predictions match the labels, nothing to review");
        return Ok(());
    }

    #[cfg(feature = "gui")]
    annotation_corrector::gui::run(session)?;

    #[cfg(not(feature = "gui"))]
    log::warn!(
        "{} images need review but the gui feature is disabled",
        session.len()
    );

    Ok(())
}
