//! YOLO text label format.
//!
//! One object per line, `class cx cy w h`, with coordinates normalized to the
//! image size. Prediction cache files append a sixth `conf` field.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum LabelError {
    #[error("wrong number of fields ({found}) in {line:?}")]
    FieldCount { found: usize, line: String },
    #[error("invalid class id in {line:?}")]
    ClassId { line: String },
    #[error("invalid coordinate {value:?} in {line:?}")]
    Coordinate { value: String, line: String },
    #[error("invalid confidence {value:?} in {line:?}")]
    Confidence { value: String, line: String },
}

/// A single YOLO annotation in normalized coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YoloLabel {
    pub class_id: u32,
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

impl YoloLabel {
    pub fn new(class_id: u32, cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { class_id, cx, cy, w, h }
    }

    /// The text form written to label files.
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    fn parse_fields(fields: &[&str], line: &str) -> Result<Self, LabelError> {
        let class_id = fields[0]
            .parse::<u32>()
            .map_err(|_| LabelError::ClassId { line: line.to_string() })?;

        let mut coords = [0f32; 4];
        for (slot, value) in coords.iter_mut().zip(&fields[1..5]) {
            *slot = value.parse::<f32>().map_err(|_| LabelError::Coordinate {
                value: value.to_string(),
                line: line.to_string(),
            })?;
        }
        let [cx, cy, w, h] = coords;
        Ok(Self { class_id, cx, cy, w, h })
    }
}

impl FromStr for YoloLabel {
    type Err = LabelError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(LabelError::FieldCount {
                found: fields.len(),
                line: line.to_string(),
            });
        }
        Self::parse_fields(&fields, line)
    }
}

impl fmt::Display for YoloLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:.6} {:.6} {:.6} {:.6}",
            self.class_id, self.cx, self.cy, self.w, self.h
        )
    }
}

/// A model prediction: a label plus its confidence score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub label: YoloLabel,
    pub confidence: f32,
}

impl FromStr for Prediction {
    type Err = LabelError;

    /// Parses `class cx cy w h [conf ...]`. A missing confidence reads as 0;
    /// fields after the confidence are ignored.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 5 {
            return Err(LabelError::FieldCount {
                found: fields.len(),
                line: line.to_string(),
            });
        }
        let label = YoloLabel::parse_fields(&fields, line)?;
        let confidence = match fields.get(5) {
            Some(value) => value.parse::<f32>().map_err(|_| LabelError::Confidence {
                value: value.to_string(),
                line: line.to_string(),
            })?,
            None => 0.0,
        };
        Ok(Self { label, confidence })
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.6}", self.label, self.confidence)
    }
}

/// Label file belonging to `image_path` inside `dir`.
pub fn label_file_for(dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".txt");
    dir.join(name)
}

/// Parsed lines paired with their trimmed source text
fn parse_file<T>(path: &Path) -> anyhow::Result<Vec<(T, String)>>
where
    T: FromStr<Err = LabelError>,
{
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read label file {}", path.display()))?;

    text.lines()
        .enumerate()
        .map(|(idx, line)| (idx, line.trim()))
        .filter(|(_, line)| !line.is_empty())
        .map(|(idx, line)| {
            line.parse::<T>()
                .map(|parsed| (parsed, line.to_string()))
                .with_context(|| format!("{}:{}", path.display(), idx + 1))
        })
        .collect()
}

/// Read ground truth labels along with the line each came from, so
/// untouched boxes can be written back as they were.
/// A missing file is not an error.
pub fn read_label_lines(path: &Path) -> anyhow::Result<Vec<(YoloLabel, String)>> {
    if !path.exists() {
        log::warn!("Label file missing: {}", path.display());
        return Ok(Vec::new());
    }
    parse_file(path)
}

/// Read ground truth labels. A missing file is not an error.
pub fn read_labels(path: &Path) -> anyhow::Result<Vec<YoloLabel>> {
    Ok(read_label_lines(path)?.into_iter().map(|(label, _)| label).collect())
}

/// Read a prediction cache file. A missing file yields no predictions.
pub fn read_predictions(path: &Path) -> anyhow::Result<Vec<Prediction>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    Ok(parse_file(path)?.into_iter().map(|(p, _)| p).collect())
}

fn write_lines<I, T>(path: &Path, items: I) -> anyhow::Result<()>
where
    I: IntoIterator<Item = T>,
    T: fmt::Display,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut text = String::new();
    for item in items {
        text.push_str(&item.to_string());
        text.push('\n');
    }
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write {}", path.display()))
}

pub fn write_labels(path: &Path, labels: &[YoloLabel]) -> anyhow::Result<()> {
    write_lines(path, labels)
}

pub fn write_predictions(path: &Path, predictions: &[Prediction]) -> anyhow::Result<()> {
    write_lines(path, predictions)
}

/// True when predictions and ground truth describe the same set of boxes.
///
/// Lines are compared in canonical form, so `0 0.5 0.5 0.2 0.2` matches
/// `0 0.500000 0.500000 0.200000 0.200000`. Confidence is ignored.
pub fn same_label_set(predictions: &[Prediction], labels: &[YoloLabel]) -> bool {
    let predicted: HashSet<String> = predictions.iter().map(|p| p.label.canonical()).collect();
    let truth: HashSet<String> = labels.iter().map(YoloLabel::canonical).collect();
    predicted == truth
}
