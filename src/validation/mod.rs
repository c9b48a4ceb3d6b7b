//! Label validation and cleanup.
//!
//! Each non-blank line of a label file must be
//! `<class_id> <x_center> <y_center> <width> <height>`: five tokens, an
//! integer class id in `[0, num_classes - 1]` and four numbers in `[0, 1]`.
//! Files that break this (or are empty) are reported together with their
//! image, and can then be deleted as a pair.

mod report;

pub use report::{DeletionReport, InvalidLabel, IssueCode, LabelIssue, ValidationReport};

use std::fs;
use std::num::IntErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::config::ValidateConfig;
use crate::error::PrepError;
use crate::layout::{list_files_with_extensions, DatasetLayout, Partition, LABEL_EXTENSION};

/// Checks a single label line.
pub fn check_line(line: &str, num_classes: usize) -> Result<(), LabelIssue> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() != 5 {
        return Err(LabelIssue::new(
            IssueCode::WrongTokenCount,
            format!("Expected 5 elements, found {}", parts.len()),
        ));
    }

    let class_id = match parts[0].parse::<i64>() {
        Ok(class_id) => class_id,
        Err(err) => {
            return Err(match err.kind() {
                IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                    class_out_of_range(parts[0], num_classes)
                }
                _ => LabelIssue::new(
                    IssueCode::ClassIdNotInteger,
                    format!("Class ID '{}' is not an integer", parts[0]),
                ),
            });
        }
    };

    if class_id < 0 || class_id as u64 >= num_classes as u64 {
        return Err(class_out_of_range(&class_id.to_string(), num_classes));
    }

    let coords: Vec<f64> = parts[1..]
        .iter()
        .map(|raw| raw.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| {
            LabelIssue::new(
                IssueCode::CoordinateNotNumeric,
                "One or more coordinates are not numeric",
            )
        })?;

    if !coords.iter().all(|v| (0.0..=1.0).contains(v)) {
        return Err(LabelIssue::new(
            IssueCode::CoordinateOutOfRange,
            format!("Coordinates not in [0, 1]: {:?}", coords),
        ));
    }

    Ok(())
}

fn class_out_of_range(class_id: &str, num_classes: usize) -> LabelIssue {
    LabelIssue::new(
        IssueCode::ClassIdOutOfRange,
        format!(
            "Class ID '{}' out of range [0, {}]",
            class_id,
            num_classes as i64 - 1
        ),
    )
}

/// Checks the contents of one label file.
///
/// Line numbers count non-blank lines only.
pub fn check_label_text(content: &str, num_classes: usize) -> Vec<LabelIssue> {
    let lines: Vec<&str> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        return vec![LabelIssue::new(IssueCode::EmptyFile, "Label file is empty")];
    }

    lines
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| check_line(line, num_classes).err().map(|i| i.at_line(idx + 1)))
        .collect()
}

/// Validates every label file under `<root>/labels/<partition>`.
///
/// Missing label directories are skipped. Read-only.
pub fn validate_dataset(config: &ValidateConfig) -> Result<ValidationReport, PrepError> {
    let layout = DatasetLayout::new(&config.dataset_root);
    let extensions: Vec<&str> = config.image_extensions.iter().map(String::as_str).collect();
    let mut report = ValidationReport::new(&config.dataset_root);

    for partition in Partition::ALL {
        let label_dir = layout.labels_dir(partition);
        if !label_dir.is_dir() {
            debug!("No label directory for '{}'", partition);
            continue;
        }

        for name in list_files_with_extensions(&label_dir, &[LABEL_EXTENSION])? {
            let label = label_dir.join(&name);
            let bytes = fs::read(&label).map_err(PrepError::Io)?;
            report.files_checked += 1;

            let issues = check_label_text(&String::from_utf8_lossy(&bytes), config.num_classes);
            if issues.is_empty() {
                continue;
            }

            let image = find_image(&layout.images_dir(partition), &label, &extensions);
            report.invalid.push(InvalidLabel {
                label,
                image,
                issues,
            });
        }
    }

    info!(
        "Checked {} label file(s), {} invalid with {} issue(s)",
        report.files_checked,
        report.invalid.len(),
        report.issue_count()
    );

    Ok(report)
}

/// First existing `<stem>.<ext>` in `images_dir`, trying `extensions` in order.
fn find_image(images_dir: &Path, label: &Path, extensions: &[&str]) -> Option<PathBuf> {
    let stem = label.file_stem()?.to_str()?;
    extensions
        .iter()
        .map(|ext| images_dir.join(format!("{stem}.{ext}")))
        .find(|candidate| candidate.is_file())
}

/// Deletes each invalid label and its image.
///
/// Failures are collected and do not stop the remaining deletions. When a
/// label cannot be removed its image is kept.
pub fn delete_invalid(report: &ValidationReport) -> DeletionReport {
    let mut deletion = DeletionReport::default();

    for entry in &report.invalid {
        if let Err(err) = fs::remove_file(&entry.label) {
            error!("Failed to delete {:?}: {}", entry.label, err);
            deletion
                .errors
                .push(format!("{}: {}", entry.label.display(), err));
            continue;
        }
        deletion.deleted_labels.push(entry.label.clone());

        let Some(image) = &entry.image else {
            continue;
        };
        if !image.exists() {
            continue;
        }
        match fs::remove_file(image) {
            Ok(()) => deletion.deleted_images.push(image.clone()),
            Err(err) => {
                error!("Failed to delete {:?}: {}", image, err);
                deletion.errors.push(format!("{}: {}", image.display(), err));
            }
        }
    }

    deletion
}
