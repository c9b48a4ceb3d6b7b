//! Merging several YOLO datasets into one tree.
//!
//! Each source is laid out as `<source>/<partition>/{images,labels}/`. Its
//! files are copied into `<output>/{images,labels}/<partition>/` with a
//! `ds<N>_` prefix, where `N` is the 1-based position of the source, so stems
//! from different sources cannot collide.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::MergeConfig;
use crate::error::PrepError;
use crate::layout::{DatasetLayout, Partition};

/// What was copied from each source.
#[derive(Clone, Debug, Default, Serialize)]
pub struct MergeReport {
    pub sources: Vec<SourceReport>,
}

impl MergeReport {
    pub fn images_copied(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| s.partitions.iter())
            .map(|p| p.images)
            .sum()
    }

    pub fn labels_copied(&self) -> usize {
        self.sources
            .iter()
            .flat_map(|s| s.partitions.iter())
            .map(|p| p.labels)
            .sum()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct SourceReport {
    pub path: PathBuf,
    pub prefix: String,
    /// False when the source directory does not exist.
    pub found: bool,
    pub partitions: Vec<PartitionCopy>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PartitionCopy {
    pub partition: Partition,
    /// Source directory name that matched (`valid` or `val`).
    pub source_dir: String,
    pub images: usize,
    pub labels: usize,
}

/// Copies every source into `config.output_root`.
pub fn merge_datasets(config: &MergeConfig) -> Result<MergeReport, PrepError> {
    let output = DatasetLayout::new(&config.output_root);
    output.ensure_dirs()?;

    let mut report = MergeReport::default();

    for (idx, source) in config.sources.iter().enumerate() {
        let prefix = format!("ds{}", idx + 1);
        let mut source_report = SourceReport {
            path: source.clone(),
            prefix: prefix.clone(),
            found: source.is_dir(),
            partitions: Vec::new(),
        };

        if !source_report.found {
            warn!("Source dataset {:?} not found, skipping", source);
            report.sources.push(source_report);
            continue;
        }

        for partition in Partition::ALL {
            let Some((dir_name, subset_path)) = find_subset_dir(source, partition) else {
                debug!("{:?} has no '{}' subset", source, partition);
                continue;
            };

            info!("Merging {} -> {} (from {:?})", prefix, partition, subset_path);

            let images = copy_and_rename(
                &subset_path.join("images"),
                &output.images_dir(partition),
                &prefix,
            )?;
            let labels = copy_and_rename(
                &subset_path.join("labels"),
                &output.labels_dir(partition),
                &prefix,
            )?;

            source_report.partitions.push(PartitionCopy {
                partition,
                source_dir: dir_name.to_string(),
                images,
                labels,
            });
        }

        report.sources.push(source_report);
    }

    Ok(report)
}

fn find_subset_dir(source: &Path, partition: Partition) -> Option<(&'static str, PathBuf)> {
    let candidates: &[&'static str] = match partition {
        Partition::Train => &["train"],
        Partition::Valid => &["valid", "val"],
        Partition::Test => &["test"],
    };

    candidates
        .iter()
        .map(|name| (*name, source.join(name)))
        .find(|(_, path)| path.is_dir())
}

/// Copies the files of `src_dir` that have an extension into `dst_dir` as
/// `<prefix>_<name>`. A missing `src_dir` copies nothing.
fn copy_and_rename(src_dir: &Path, dst_dir: &Path, prefix: &str) -> Result<usize, PrepError> {
    if !src_dir.is_dir() {
        return Ok(0);
    }

    let mut copied = 0;

    for entry in WalkDir::new(src_dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|source| PrepError::Walk {
            path: src_dir.to_path_buf(),
            source,
        })?;

        if !entry.path().is_file() || entry.path().extension().is_none() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            warn!("Skipping non UTF-8 file name {:?}", entry.path());
            continue;
        };

        let dst = dst_dir.join(format!("{prefix}_{name}"));
        fs::copy(entry.path(), &dst).map_err(PrepError::Io)?;
        copied += 1;
    }

    Ok(copied)
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in &self.sources {
            if !source.found {
                writeln!(f, "{} {:?}: not found, skipped", source.prefix, source.path)?;
                continue;
            }
            writeln!(f, "{} {:?}:", source.prefix, source.path)?;
            if source.partitions.is_empty() {
                writeln!(f, "  no train/valid/test subsets")?;
            }
            for copy in &source.partitions {
                writeln!(
                    f,
                    "  {} -> {}: {} image(s), {} label(s)",
                    copy.source_dir, copy.partition, copy.images, copy.labels
                )?;
            }
        }
        writeln!(f)?;
        writeln!(
            f,
            "Merge completed: {} image(s), {} label(s)",
            self.images_copied(),
            self.labels_copied()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, contents).expect("write file");
    }

    #[test]
    fn merges_with_prefixes_and_val_alias() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        let output = temp.path().join("merged");

        write(&first.join("train/images/car.jpg"), "img");
        write(&first.join("train/labels/car.txt"), "0 0.5 0.5 0.2 0.2\n");
        write(&second.join("val/images/car.jpg"), "img");
        write(&second.join("val/labels/car.txt"), "0 0.5 0.5 0.2 0.2\n");
        write(&second.join("val/images/README"), "no extension");

        let report = merge_datasets(&MergeConfig {
            sources: vec![first, second, temp.path().join("missing")],
            output_root: output.clone(),
        })
        .expect("merge");

        assert!(output.join("images/train/ds1_car.jpg").is_file());
        assert!(output.join("labels/train/ds1_car.txt").is_file());
        assert!(output.join("images/valid/ds2_car.jpg").is_file());
        assert!(output.join("labels/valid/ds2_car.txt").is_file());
        assert!(!output.join("images/valid/ds2_README").exists());
        assert!(output.join("images/test").is_dir());

        assert_eq!(report.images_copied(), 2);
        assert_eq!(report.labels_copied(), 2);
        assert!(!report.sources[2].found);
        assert_eq!(report.sources[1].partitions[0].source_dir, "val");
    }

    #[test]
    fn rerunning_a_merge_overwrites_instead_of_duplicating() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let source = temp.path().join("src");
        write(&source.join("test/images/a.png"), "img");
        let config = MergeConfig {
            sources: vec![source],
            output_root: temp.path().join("out"),
        };

        merge_datasets(&config).expect("first merge");
        merge_datasets(&config).expect("second merge");

        let files: Vec<_> = fs::read_dir(temp.path().join("out/images/test"))
            .expect("read dir")
            .collect();
        assert_eq!(files.len(), 1);
    }
}
