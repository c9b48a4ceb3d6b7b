//! Split report types and terminal formatting.

use serde::Serialize;
use std::fmt;

use super::targets::TargetAdjustment;
use crate::layout::{Partition, PartitionMap};

/// Everything a split run did, from first count to final count.
#[derive(Clone, Debug, Serialize)]
pub struct RebalanceReport {
    /// Total images across all partitions before moving.
    pub total: usize,
    pub targets: PartitionMap<usize>,
    /// Targets lowered because the dataset was too small for the ratios.
    pub adjustments: Vec<TargetAdjustment>,
    pub before: PartitionMap<usize>,
    pub after: PartitionMap<usize>,
    pub batches: Vec<MoveBatch>,
    pub moves: Vec<MovedSample>,
    /// Labels left behind by an interrupted earlier run and moved now.
    pub recovered_labels: Vec<LabelRecovery>,
    /// Images left out of counting and moving because their file names are
    /// not valid UTF-8 (shown lossily).
    pub unlisted_images: Vec<String>,
    pub failures: Vec<MoveFailure>,
    pub shortfalls: Vec<Shortfall>,
    /// True when the run only planned moves on an in-memory snapshot.
    pub dry_run: bool,
}

impl RebalanceReport {
    /// Number of samples whose image changed partition.
    pub fn moved_count(&self) -> usize {
        self.moves.len()
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// True when every partition reached its target and nothing failed.
    pub fn is_balanced(&self) -> bool {
        self.shortfalls.is_empty() && self.failures.is_empty()
    }
}

impl fmt::Display for RebalanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            writeln!(f, "Dry run: no files were moved")?;
        }
        writeln!(f, "Total images: {}", self.total)?;
        writeln!(f, "Target split: {}", self.targets)?;
        writeln!(f, "Current split: {}", self.before)?;

        for adjustment in &self.adjustments {
            writeln!(
                f,
                "  note: target for '{}' clamped from {} to {} (too few images for the ratios)",
                adjustment.partition, adjustment.raw, adjustment.adjusted
            )?;
        }

        if !self.recovered_labels.is_empty() {
            writeln!(f)?;
            writeln!(f, "Recovered labels ({}):", self.recovered_labels.len())?;
            for recovery in &self.recovered_labels {
                writeln!(
                    f,
                    "  - {}.txt: {} -> {}",
                    recovery.stem, recovery.from, recovery.to
                )?;
            }
        }

        if !self.unlisted_images.is_empty() {
            writeln!(f)?;
            writeln!(
                f,
                "Not counted, non UTF-8 file names ({}):",
                self.unlisted_images.len()
            )?;
            for path in &self.unlisted_images {
                writeln!(f, "  - {}", path)?;
            }
        }

        if !self.batches.is_empty() {
            writeln!(f)?;
            writeln!(f, "Moves:")?;
            for batch in &self.batches {
                writeln!(
                    f,
                    "  {} -> {}: {} of {} image(s)",
                    batch.from, batch.to, batch.moved, batch.requested
                )?;
            }
        }

        if !self.failures.is_empty() {
            writeln!(f)?;
            writeln!(f, "Failures ({}):", self.failures.len())?;
            for failure in &self.failures {
                writeln!(f, "  - {}", failure)?;
            }
        }

        if !self.shortfalls.is_empty() {
            writeln!(f)?;
            writeln!(f, "Shortfalls ({}):", self.shortfalls.len())?;
            for shortfall in &self.shortfalls {
                writeln!(
                    f,
                    "  - {}: {} of {} image(s), {} short",
                    shortfall.partition,
                    shortfall.actual,
                    shortfall.target,
                    shortfall.missing()
                )?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Final split counts:")?;
        let total = self.after.total();
        for (partition, count) in self.after.iter() {
            writeln!(
                f,
                "  {:<6} → {:>4} images ({:.1}%)",
                partition.as_str(),
                count,
                percent(*count, total)
            )?;
        }

        Ok(())
    }
}

pub(crate) fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Moves from one donor to one deficit partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveBatch {
    pub from: Partition,
    pub to: Partition,
    /// `min(donor surplus, remaining deficit)` when the batch started.
    pub requested: usize,
    pub moved: usize,
}

/// A sample whose image changed partition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MovedSample {
    pub file_name: String,
    pub from: Partition,
    pub to: Partition,
    pub label: LabelStatus,
}

/// What happened to the label of a moved image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelStatus {
    Moved,
    /// The sample had no label.
    Missing,
    /// The image moved but the label stayed behind; the next run recovers it.
    Failed,
}

/// A stranded label moved to the partition holding its image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LabelRecovery {
    pub stem: String,
    pub from: Partition,
    pub to: Partition,
}

/// A file operation that failed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    pub kind: FileKind,
    pub file_name: String,
    pub from: Partition,
    pub to: Partition,
    pub message: String,
}

impl fmt::Display for MoveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} -> {}): {}",
            self.kind, self.file_name, self.from, self.to, self.message
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    Image,
    Label,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileKind::Image => write!(f, "image"),
            FileKind::Label => write!(f, "label"),
        }
    }
}

/// A partition left below its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Shortfall {
    pub partition: Partition,
    pub target: usize,
    pub actual: usize,
}

impl Shortfall {
    pub fn missing(&self) -> usize {
        self.target.saturating_sub(self.actual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> RebalanceReport {
        RebalanceReport {
            total: 100,
            targets: PartitionMap::new(70, 20, 10),
            adjustments: vec![],
            before: PartitionMap::new(100, 0, 0),
            after: PartitionMap::new(70, 20, 10),
            batches: vec![
                MoveBatch {
                    from: Partition::Train,
                    to: Partition::Valid,
                    requested: 20,
                    moved: 20,
                },
                MoveBatch {
                    from: Partition::Train,
                    to: Partition::Test,
                    requested: 10,
                    moved: 10,
                },
            ],
            moves: vec![],
            recovered_labels: vec![],
            unlisted_images: vec![],
            failures: vec![],
            shortfalls: vec![],
            dry_run: false,
        }
    }

    #[test]
    fn display_lists_batches_and_percentages() {
        let text = report().to_string();
        assert!(text.contains("Total images: 100"));
        assert!(text.contains("Target split: {train: 70, valid: 20, test: 10}"));
        assert!(text.contains("train -> valid: 20 of 20 image(s)"));
        assert!(text.contains("  train  →   70 images (70.0%)"));
        assert!(text.contains("  test   →   10 images (10.0%)"));
        assert!(!text.contains("Shortfalls"));
    }

    #[test]
    fn display_surfaces_shortfalls_and_failures() {
        let mut report = report();
        report.shortfalls.push(Shortfall {
            partition: Partition::Valid,
            target: 20,
            actual: 19,
        });
        report.failures.push(MoveFailure {
            kind: FileKind::Image,
            file_name: "ds1_a.jpg".to_string(),
            from: Partition::Train,
            to: Partition::Valid,
            message: "permission denied".to_string(),
        });

        let text = report.to_string();
        assert!(text.contains("valid: 19 of 20 image(s), 1 short"));
        assert!(text.contains("image ds1_a.jpg (train -> valid): permission denied"));
        assert!(!report.is_balanced());
    }

    #[test]
    fn json_uses_partition_names() {
        let json = serde_json::to_value(report()).expect("serialize");
        assert_eq!(json["targets"]["valid"], 20);
        assert_eq!(json["batches"][1]["to"], "test");
    }
}
