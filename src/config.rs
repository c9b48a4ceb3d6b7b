//! Fixed configuration constants and the immutable config structs built from
//! them.
//!
//! Nothing is parsed from a file. The CLI starts from these defaults and lets
//! individual flags override them before handing a config to the library.

use std::path::PathBuf;

use crate::error::PrepError;
use crate::layout::{Partition, PartitionMap};

/// Default merged dataset root.
pub const DEFAULT_DATASET_ROOT: &str = "Pakistani License Plates (Merged) - YOLOv11";

/// Default source datasets for the merge step, in prefix order (`ds1`, `ds2`, ...).
pub const DEFAULT_MERGE_SOURCES: [&str; 5] = [
    "Car Number Plate Detection.v1i.yolov11",
    "model.v1i.yolov11",
    "numberplate.v1i.yolov11",
    "Pakistani License Plates.v2i.yolov11",
    "Pakistani-Number-plates.v1i.yolov11",
];

/// Image extensions considered by the splitter.
pub const SPLIT_IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Image extensions considered by the split summary.
pub const SUMMARY_IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

/// Image extensions searched, in order, when pairing an invalid label with its image.
pub const VALIDATE_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Number of classes in the dataset.
pub const NUM_CLASSES: usize = 1;

/// Default split fractions: 70% train, 20% valid, 10% test.
pub const DEFAULT_FRACTIONS: [f64; 3] = [0.7, 0.2, 0.1];

/// Fractions must sum to 1.0 within this tolerance.
const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration of the splitter.
#[derive(Clone, Debug)]
pub struct SplitConfig {
    pub dataset_root: PathBuf,
    /// Target fraction per partition.
    pub fractions: PartitionMap<f64>,
    /// Recognized image extensions, without the dot.
    pub extensions: Vec<String>,
    /// Order used for target computation and for filling deficits. The last
    /// partition absorbs rounding slack.
    pub partition_order: Vec<Partition>,
    /// Order in which donors are drained.
    pub donor_priority: Vec<Partition>,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let [train, valid, test] = DEFAULT_FRACTIONS;
        Self {
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            fractions: PartitionMap::new(train, valid, test),
            extensions: SPLIT_IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            partition_order: Partition::ALL.to_vec(),
            donor_priority: Partition::ALL.to_vec(),
        }
    }
}

impl SplitConfig {
    /// Default config rooted at `dataset_root`.
    pub fn with_root(dataset_root: impl Into<PathBuf>) -> Self {
        Self {
            dataset_root: dataset_root.into(),
            ..Self::default()
        }
    }

    /// Checks fractions and orders before any file is touched.
    pub fn validate(&self) -> Result<(), PrepError> {
        for (partition, fraction) in self.fractions.iter() {
            if !(*fraction > 0.0 && *fraction <= 1.0) {
                return Err(PrepError::InvalidConfig {
                    message: format!(
                        "fraction for '{}' must be in the interval (0.0, 1.0], got {}",
                        partition, fraction
                    ),
                });
            }
        }

        let sum: f64 = self.fractions.iter().map(|(_, f)| *f).sum();
        if (sum - 1.0).abs() > FRACTION_SUM_TOLERANCE {
            return Err(PrepError::InvalidConfig {
                message: format!("fractions must sum to 1.0, got {sum}"),
            });
        }

        check_permutation("partition order", &self.partition_order)?;
        check_permutation("donor priority", &self.donor_priority)?;

        if self.extensions.is_empty() {
            return Err(PrepError::InvalidConfig {
                message: "at least one image extension is required".to_string(),
            });
        }

        Ok(())
    }
}

fn check_permutation(what: &str, order: &[Partition]) -> Result<(), PrepError> {
    let mut sorted = order.to_vec();
    sorted.sort();
    if sorted != Partition::ALL {
        let names: Vec<&str> = order.iter().map(Partition::as_str).collect();
        return Err(PrepError::InvalidConfig {
            message: format!(
                "{what} must list train, valid and test exactly once, got [{}]",
                names.join(", ")
            ),
        });
    }
    Ok(())
}

/// Configuration of the label validator.
#[derive(Clone, Debug)]
pub struct ValidateConfig {
    pub dataset_root: PathBuf,
    /// Class ids must be in `0..num_classes`.
    pub num_classes: usize,
    /// Extensions tried, in order, when looking up the image of a label.
    pub image_extensions: Vec<String>,
}

impl Default for ValidateConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from(DEFAULT_DATASET_ROOT),
            num_classes: NUM_CLASSES,
            image_extensions: VALIDATE_IMAGE_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Configuration of the merge step.
#[derive(Clone, Debug)]
pub struct MergeConfig {
    /// Source dataset roots; the index decides the `ds<N>_` prefix.
    pub sources: Vec<PathBuf>,
    pub output_root: PathBuf,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            sources: DEFAULT_MERGE_SOURCES.iter().map(PathBuf::from).collect(),
            output_root: PathBuf::from(DEFAULT_DATASET_ROOT),
        }
    }
}

/// Parses `--ratios 0.7,0.2,0.1` (train, valid, test).
pub fn parse_fractions(raw: &str) -> Result<PartitionMap<f64>, PrepError> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| PrepError::InvalidConfig {
                    message: format!("invalid ratio '{}'; expected a number", part.trim()),
                })
        })
        .collect::<Result<_, _>>()?;

    match values.as_slice() {
        [train, valid, test] => Ok(PartitionMap::new(*train, *valid, *test)),
        _ => Err(PrepError::InvalidConfig {
            message: format!(
                "expected three ratios (train,valid,test), got {}",
                values.len()
            ),
        }),
    }
}

/// Parses a comma separated partition order such as `train,valid,test`.
pub fn parse_partition_order(raw: &str) -> Result<Vec<Partition>, PrepError> {
    raw.split(',')
        .map(|part| {
            Partition::parse(part).ok_or_else(|| PrepError::InvalidConfig {
                message: format!("unknown partition '{}'", part.trim()),
            })
        })
        .collect()
}
