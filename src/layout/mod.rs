//! Dataset directory layout.
//!
//! A dataset root holds two parallel trees, `images/` and `labels/`, each with
//! the three partitions `train`, `valid` and `test`:
//!
//! ```text
//! <root>/images/{train,valid,test}/<stem>.<ext>
//! <root>/labels/{train,valid,test}/<stem>.txt
//! ```

mod scan;

pub use scan::{count_files, list_files_with_extensions, scan_dir, DirListing};

use std::fmt;
use std::fs;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::PrepError;

/// Extension used by label files.
pub const LABEL_EXTENSION: &str = "txt";

/// One of the three dataset subsets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    Train,
    Valid,
    Test,
}

impl Partition {
    /// All partitions in canonical order.
    pub const ALL: [Partition; 3] = [Partition::Train, Partition::Valid, Partition::Test];

    /// Directory name of the partition.
    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Train => "train",
            Partition::Valid => "valid",
            Partition::Test => "test",
        }
    }

    /// Parses a partition name. `val` is accepted as an alias of `valid`.
    pub fn parse(raw: &str) -> Option<Partition> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "train" => Some(Partition::Train),
            "valid" | "val" => Some(Partition::Valid),
            "test" => Some(Partition::Test),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        match self {
            Partition::Train => 0,
            Partition::Valid => 1,
            Partition::Test => 2,
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value per partition, indexed by [`Partition`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PartitionMap<T> {
    values: [T; 3],
}

impl<T> PartitionMap<T> {
    /// Creates a map from per-partition values.
    pub fn new(train: T, valid: T, test: T) -> Self {
        Self {
            values: [train, valid, test],
        }
    }

    /// Iterates `(partition, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Partition, &T)> {
        Partition::ALL.into_iter().zip(self.values.iter())
    }
}

impl PartitionMap<usize> {
    /// Sum over all partitions.
    pub fn total(&self) -> usize {
        self.values.iter().sum()
    }
}

impl<T> Index<Partition> for PartitionMap<T> {
    type Output = T;

    fn index(&self, partition: Partition) -> &T {
        &self.values[partition.slot()]
    }
}

impl<T> IndexMut<Partition> for PartitionMap<T> {
    fn index_mut(&mut self, partition: Partition) -> &mut T {
        &mut self.values[partition.slot()]
    }
}

impl<T: fmt::Display> fmt::Display for PartitionMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(partition, value)| format!("{}: {}", partition, value))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

impl<T: Serialize> Serialize for PartitionMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        for (partition, value) in self.iter() {
            map.serialize_entry(partition.as_str(), value)?;
        }
        map.end()
    }
}

/// Paths of a dataset root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatasetLayout {
    root: PathBuf,
}

impl DatasetLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<root>/images/<partition>`
    pub fn images_dir(&self, partition: Partition) -> PathBuf {
        self.root.join("images").join(partition.as_str())
    }

    /// `<root>/labels/<partition>`
    pub fn labels_dir(&self, partition: Partition) -> PathBuf {
        self.root.join("labels").join(partition.as_str())
    }

    /// Path of the label belonging to `stem` in `partition`.
    pub fn label_path(&self, partition: Partition, stem: &str) -> PathBuf {
        self.labels_dir(partition)
            .join(format!("{stem}.{LABEL_EXTENSION}"))
    }

    /// Creates all six partition directories.
    pub fn ensure_dirs(&self) -> Result<(), PrepError> {
        for partition in Partition::ALL {
            fs::create_dir_all(self.images_dir(partition)).map_err(PrepError::Io)?;
            fs::create_dir_all(self.labels_dir(partition)).map_err(PrepError::Io)?;
        }
        Ok(())
    }
}

/// Stem of a file name (`a.b.jpg` -> `a.b`).
pub fn file_stem(file_name: &str) -> &str {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
}
