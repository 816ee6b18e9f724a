//! Per-image review decisions.
//!
//! Predictions start rejected and ground truth starts kept; the reviewer
//! flips them and may move box corners. Saving writes kept ground truth
//! followed by accepted predictions.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use image::{DynamicImage, GenericImageView};

use crate::geometry::BoundingBox;
use crate::label::{Prediction, YoloLabel};

pub const NO_LABELS: &str = "No labels selected";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionState {
    pub label: YoloLabel,
    pub confidence: f32,
    pub accepted: bool,
}

impl From<Prediction> for PredictionState {
    fn from(p: Prediction) -> Self {
        Self {
            label: p.label,
            confidence: p.confidence,
            accepted: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroundTruthState {
    pub label: YoloLabel,
    pub kept: bool,
    /// Line read from the label file, dropped once the box is edited
    pub source: Option<String>,
}

impl GroundTruthState {
    /// Text written on save: the original line when unedited
    pub fn line(&self) -> String {
        self.source.clone().unwrap_or_else(|| self.label.canonical())
    }
}

impl From<YoloLabel> for GroundTruthState {
    fn from(label: YoloLabel) -> Self {
        Self {
            label,
            kept: true,
            source: None,
        }
    }
}

impl From<(YoloLabel, String)> for GroundTruthState {
    fn from((label, line): (YoloLabel, String)) -> Self {
        Self {
            label,
            kept: true,
            source: Some(line),
        }
    }
}

/// An image whose predictions disagree with its ground truth
#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub image_path: PathBuf,
    pub image: Arc<DynamicImage>,
    pub label_file: PathBuf,
    pub predictions: Vec<PredictionState>,
    pub ground_truth: Vec<GroundTruthState>,
}

impl ReviewItem {
    pub fn new(
        image_path: PathBuf,
        image: DynamicImage,
        label_file: PathBuf,
        predictions: Vec<Prediction>,
        ground_truth: impl IntoIterator<Item = impl Into<GroundTruthState>>,
    ) -> Self {
        Self {
            image_path,
            image: Arc::new(image),
            label_file,
            predictions: predictions.into_iter().map(Into::into).collect(),
            ground_truth: ground_truth.into_iter().map(Into::into).collect(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn prediction_box(&self, idx: usize) -> Option<BoundingBox> {
        let (w, h) = self.dimensions();
        self.predictions
            .get(idx)
            .map(|p| BoundingBox::from_label(&p.label, w, h))
    }

    pub fn ground_truth_box(&self, idx: usize) -> Option<BoundingBox> {
        let (w, h) = self.dimensions();
        self.ground_truth
            .get(idx)
            .map(|g| BoundingBox::from_label(&g.label, w, h))
    }

    pub fn toggle_prediction(&mut self, idx: usize) {
        if let Some(p) = self.predictions.get_mut(idx) {
            p.accepted = !p.accepted;
        }
    }

    pub fn toggle_ground_truth(&mut self, idx: usize) {
        if let Some(g) = self.ground_truth.get_mut(idx) {
            g.kept = !g.kept;
        }
    }

    fn spanned(&self, class_id: u32, anchor: (f32, f32), px: f32, py: f32) -> YoloLabel {
        let (w, h) = self.dimensions();
        BoundingBox::spanning(anchor, px, py).to_label(class_id, w, h)
    }

    /// Reshape a predicted box to span from the pixel `anchor` fixed at drag
    /// start to the dragged point `(px, py)`
    pub fn resize_prediction(&mut self, idx: usize, anchor: (f32, f32), px: f32, py: f32) {
        if let Some(class_id) = self.predictions.get(idx).map(|p| p.label.class_id) {
            self.predictions[idx].label = self.spanned(class_id, anchor, px, py);
        }
    }

    /// Like [`ReviewItem::resize_prediction`]; the box is then written in
    /// canonical form instead of its original line
    pub fn resize_ground_truth(&mut self, idx: usize, anchor: (f32, f32), px: f32, py: f32) {
        if let Some(class_id) = self.ground_truth.get(idx).map(|g| g.label.class_id) {
            let label = self.spanned(class_id, anchor, px, py);
            let state = &mut self.ground_truth[idx];
            state.label = label;
            state.source = None;
        }
    }

    /// Labels that will be written: kept ground truth, then accepted predictions
    pub fn final_labels(&self) -> Vec<YoloLabel> {
        self.ground_truth
            .iter()
            .filter(|g| g.kept)
            .map(|g| g.label)
            .chain(self.predictions.iter().filter(|p| p.accepted).map(|p| p.label))
            .collect()
    }

    /// Lines to save, in the same order as [`ReviewItem::final_labels`]
    pub fn collect_lines(&self) -> Vec<String> {
        self.ground_truth
            .iter()
            .filter(|g| g.kept)
            .map(GroundTruthState::line)
            .chain(
                self.predictions
                    .iter()
                    .filter(|p| p.accepted)
                    .map(|p| p.label.canonical()),
            )
            .collect()
    }

    pub fn preview_text(&self) -> String {
        let lines = self.collect_lines();
        if lines.is_empty() {
            NO_LABELS.to_string()
        } else {
            lines.join("\n")
        }
    }

    /// For each prediction, whether it disagrees with the kept ground truth.
    ///
    /// A prediction disagrees when it overlaps no kept box, or when the box it
    /// overlaps most has another class.
    pub fn flag_predictions(&self) -> Vec<bool> {
        let (w, h) = self.dimensions();
        let kept: Vec<(u32, BoundingBox)> = self
            .ground_truth
            .iter()
            .filter(|g| g.kept)
            .map(|g| (g.label.class_id, BoundingBox::from_label(&g.label, w, h)))
            .collect();

        self.predictions
            .iter()
            .map(|p| {
                let pbox = BoundingBox::from_label(&p.label, w, h);
                let best = kept
                    .iter()
                    .map(|(class_id, gbox)| (*class_id, pbox.iou(gbox)))
                    .fold(None, |best: Option<(u32, f32)>, cur| match best {
                        Some(b) if b.1 >= cur.1 => Some(b),
                        _ if cur.1 > 0.0 => Some(cur),
                        _ => best,
                    });
                match best {
                    Some((class_id, _)) => class_id != p.label.class_id,
                    None => true,
                }
            })
            .collect()
    }
}

/// Images under review plus the class names used to label them
#[derive(Debug, Clone, Default)]
pub struct ReviewSession {
    pub items: Vec<ReviewItem>,
    pub class_names: Vec<String>,
}

impl ReviewSession {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn class_name(&self, class_id: u32) -> String {
        class_name(&self.class_names, class_id)
    }

    /// Snapshot of every label file's final content
    pub fn save_job(&self) -> SaveJob {
        SaveJob {
            files: self
                .items
                .iter()
                .map(|item| (item.label_file.clone(), item.collect_lines()))
                .collect(),
        }
    }

    /// Write all label files
    pub fn save_all(&self) -> anyhow::Result<usize> {
        self.save_job().write()
    }
}

/// Display name for a class id, falling back to the number
pub fn class_name(names: &[String], class_id: u32) -> String {
    names
        .get(class_id as usize)
        .cloned()
        .unwrap_or_else(|| class_id.to_string())
}

/// Label file contents captured at save time
#[derive(Debug, Clone, PartialEq)]
pub struct SaveJob {
    pub files: Vec<(PathBuf, Vec<String>)>,
}

fn render(lines: &[String]) -> String {
    lines.iter().map(|l| format!("{l}\n")).collect()
}

impl SaveJob {
    pub fn write(&self) -> anyhow::Result<usize> {
        for (path, lines) in &self.files {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, render(lines))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        log::info!("Saved {} label files", self.files.len());
        Ok(self.files.len())
    }

    /// Same as [`SaveJob::write`] without blocking the UI thread
    pub async fn write_async(self) -> anyhow::Result<usize> {
        for (path, lines) in &self.files {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            tokio::fs::write(path, render(lines))
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        log::info!("Saved {} label files", self.files.len());
        Ok(self.files.len())
    }
}
