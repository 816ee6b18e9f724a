//! Integration tests for preparing a review session.
//!
//! Tests cover:
//! - Copying label files into the corrected directory without overwriting
//! - Skipping images whose cached predictions match the labels
//! - Running a detector and caching its predictions
//! - Skipping images with malformed label files

mod common;

use std::sync::Arc;

use annotation_corrector::dataset::{self, list_images, prepare_session};

use common::*;

#[test]
fn test_copy_missing_labels_keeps_existing_files() -> anyhow::Result<()> {
    let data = TestDataset::new();
    data.add_label("a", "0 0.5 0.5 0.2 0.2\n");
    data.add_label("b", "1 0.5 0.5 0.2 0.2\n");

    std::fs::create_dir_all(&data.corrected)?;
    write_file(&data.corrected.join("a.txt"), "edited\n");

    let copied = dataset::copy_missing_labels(&data.labels, &data.corrected)?;
    assert_eq!(copied, 1);
    assert_eq!(data.corrected_label("a"), "edited\n");
    assert_eq!(data.corrected_label("b"), "1 0.5 0.5 0.2 0.2\n");

    Ok(())
}

#[test]
fn test_list_images_filters_and_sorts() -> anyhow::Result<()> {
    let data = TestDataset::new();
    data.add_image("b", 8, 8);
    data.add_image("a", 8, 8);
    write_file(&data.images.join("notes.txt"), "not an image");

    let images = list_images(&data.images)?;
    let names: Vec<_> = images
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.png", "b.png"]);

    Ok(())
}

#[test]
fn test_cached_predictions_only_keep_disagreements() -> anyhow::Result<()> {
    let data = TestDataset::new();
    data.add_image("same", 100, 100);
    data.add_image("differs", 100, 100);
    data.add_label("same", "0 0.5 0.5 0.2 0.2\n");
    data.add_label("differs", "0 0.5 0.5 0.2 0.2\n");
    // same box written with a different precision still matches
    data.add_cached_prediction("same", "0 0.500000 0.500000 0.200000 0.200000 0.870000\n");
    data.add_cached_prediction("differs", "1 0.5 0.5 0.2 0.2 0.6\n");

    let classes = write_file(&data.dir.path().join("classes.txt"), "car\nperson\n");
    let mut config = data.config();
    config.use_cached_predictions = true;
    config.classes = Some(classes);

    let session = prepare_session(&config, |_| panic!("model must not be loaded"))?;

    assert_eq!(session.len(), 1);
    let item = &session.items[0];
    assert!(item.image_path.ends_with("differs.png"));
    assert_eq!(item.label_file, data.corrected.join("differs.txt"));
    assert_eq!(item.predictions.len(), 1);
    assert_eq!(item.ground_truth.len(), 1);
    assert_eq!(session.class_names, vec!["car", "person"]);
    assert_eq!(session.class_name(1), "person");
    assert_eq!(session.class_name(7), "7");

    Ok(())
}

#[test]
fn test_detector_predictions_are_cached() -> anyhow::Result<()> {
    let data = TestDataset::new();
    data.add_image("agrees", 100, 100);
    data.add_image("missing_box", 100, 100);
    data.add_label("agrees", "0 0.25 0.4 0.3 0.4\n");
    data.add_label("missing_box", "");

    let detector = Arc::new(StubDetector::new(vec![detection(0, 0.9, 10.0, 20.0, 30.0, 40.0)]));
    let config = data.config();
    let session = prepare_session(&config, |_| Ok(stub_predictor(detector.clone())))?;

    assert_eq!(detector.calls(), 2);
    assert_eq!(session.len(), 1);
    assert!(session.items[0].image_path.ends_with("missing_box.png"));
    // class names fall back to the detector's
    assert_eq!(session.class_names, vec!["car", "person"]);

    let cached = std::fs::read_to_string(config.predictions_dir().join("agrees.txt"))?;
    assert_eq!(cached, "0 0.250000 0.400000 0.300000 0.400000 0.900000\n");

    Ok(())
}

#[test]
fn test_malformed_labels_skip_image() -> anyhow::Result<()> {
    let data = TestDataset::new();
    data.add_image("broken", 100, 100);
    data.add_label("broken", "0 0.5 0.5\n");
    data.add_cached_prediction("broken", "0 0.5 0.5 0.2 0.2 0.9\n");

    let mut config = data.config();
    config.use_cached_predictions = true;
    let session = prepare_session(&config, |_| panic!("model must not be loaded"))?;

    assert!(session.is_empty());
    // left untouched for the user to fix
    assert_eq!(data.corrected_label("broken"), "0 0.5 0.5\n");

    Ok(())
}

#[test]
fn test_undecodable_image_is_skipped() -> anyhow::Result<()> {
    let data = TestDataset::new();
    write_file(&data.images.join("corrupt.png"), "not really a png");
    data.add_image("fine", 100, 100);
    data.add_cached_prediction("fine", "0 0.5 0.5 0.2 0.2 0.9\n");

    let mut config = data.config();
    config.use_cached_predictions = true;
    let session = prepare_session(&config, |_| panic!("model must not be loaded"))?;

    assert_eq!(session.len(), 1);
    assert!(session.items[0].image_path.ends_with("fine.png"));
    assert!(session.items[0].ground_truth.is_empty());

    Ok(())
}
