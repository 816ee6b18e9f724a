use anyhow::Result;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::Arc;

use crate::detection::Detection;

/// Region of the original image, in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Data that flows through the pipeline
/// Each PipelineData is one view of the input image plus what was found in it
#[derive(Clone)]
pub struct PipelineData {
    /// The image data for this view (a tile, or the whole image)
    pub image: DynamicImage,

    /// Region of the original image this view covers (None means full image)
    pub region: Option<Region>,

    /// Detections in original image coordinates
    pub detections: Vec<Detection>,
}

impl PipelineData {
    /// Create PipelineData for a full image
    pub fn from_image(image: DynamicImage) -> Self {
        Self {
            image,
            region: None,
            detections: Vec::new(),
        }
    }

    /// Create PipelineData for a region of an image
    pub fn from_region(image: DynamicImage, region: Region) -> Self {
        Self {
            image,
            region: Some(region),
            detections: Vec::new(),
        }
    }

    /// Offset of this view inside the original image
    pub fn offset(&self) -> (u32, u32) {
        self.region.map(|r| (r.x, r.y)).unwrap_or((0, 0))
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Process data and return transformed data
    /// Steps can split data (1 → many), filter (many → fewer), or transform (many → many)
    fn process(&self, data: Vec<PipelineData>, context: &PipelineContext) -> Result<Vec<PipelineData>>;

    /// Human-readable name for this step (used in log output)
    fn name(&self) -> &str;
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Set debug mode from an optional directory
    pub fn with_optional_debug(self, output_dir: Option<PathBuf>) -> Result<Self> {
        match output_dir {
            Some(dir) => self.with_debug(dir),
            None => Ok(self),
        }
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Run the pipeline sequentially on an input image
    pub fn run(&self, input: DynamicImage) -> Result<Vec<PipelineData>> {
        self.run_named("input", input)
    }

    /// Run the pipeline; `name` keeps debug outputs of different images apart
    pub fn run_named(&self, name: &str, input: DynamicImage) -> Result<Vec<PipelineData>> {
        let mut data = vec![PipelineData::from_image(input)];
        self.save_debug(name, 0, "input", &data)?;

        for (step_idx, step) in self.steps.iter().enumerate() {
            log::debug!("Running step: {} (processing {} items)", step.name(), data.len());
            data = step.process(data, &self.context)?;
            self.save_debug(name, step_idx + 1, step.name(), &data)?;
            log::debug!("  → {} items", data.len());
        }

        Ok(data)
    }

    fn save_debug(&self, name: &str, step_idx: usize, step_name: &str, data: &[PipelineData]) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let step_dir_name = format!(
            "{:02}_{}",
            step_idx,
            step_name.to_lowercase().replace(' ', "_")
        );
        let step_dir = debug_config.output_dir.join(name).join(&step_dir_name);
        std::fs::create_dir_all(&step_dir)?;

        for (idx, item) in data.iter().enumerate() {
            let output_path = step_dir.join(format!("{:02}.png", idx + 1));
            item.image
                .save(&output_path)
                .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        }

        log::debug!("  Debug: saved {} images to {}/{}/", data.len(), name, step_dir_name);
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    /// Splits every view into two
    struct Duplicate;

    impl PipelineStep for Duplicate {
        fn process(&self, data: Vec<PipelineData>, _context: &PipelineContext) -> Result<Vec<PipelineData>> {
            Ok(data.into_iter().flat_map(|d| [d.clone(), d]).collect())
        }

        fn name(&self) -> &str {
            "Duplicate Views"
        }
    }

    fn image() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
    }

    #[test]
    fn steps_run_in_order() {
        let pipeline = Pipeline::new()
            .add_step(Arc::new(Duplicate))
            .add_step(Arc::new(Duplicate));
        let out = pipeline.run(image()).unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|d| d.offset() == (0, 0)));
    }

    #[test]
    fn debug_dir_must_be_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("stale.png"), b"").unwrap();
        assert!(Pipeline::new().with_debug(dir.path().to_path_buf()).is_err());
    }

    #[test]
    fn debug_images_are_grouped_by_name_and_step() {
        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("debug");
        let pipeline = Pipeline::new()
            .with_debug(out.clone())
            .unwrap()
            .add_step(Arc::new(Duplicate));

        pipeline.run_named("frame_1", image()).unwrap();

        assert!(out.join("frame_1/00_input/01.png").exists());
        assert!(out.join("frame_1/01_duplicate_views/02.png").exists());
    }
}
