//! In-memory sample store.
//!
//! Used for dry runs (plan a split without touching the disk) and as a fake
//! in tests and benches.

use std::collections::BTreeSet;
use std::io;
use std::path::PathBuf;

use super::store::SampleStore;
use crate::error::PrepError;
use crate::layout::{file_stem, Partition, PartitionMap};

/// Samples held in sorted sets, one per partition.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    images: PartitionMap<BTreeSet<String>>,
    labels: PartitionMap<BTreeSet<String>>,
    non_utf8: PartitionMap<Vec<PathBuf>>,
    failing_images: BTreeSet<String>,
    failing_labels: BTreeSet<String>,
    moves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the current listing of another store.
    pub fn snapshot<S: SampleStore + ?Sized>(store: &S) -> Result<Self, PrepError> {
        let mut snapshot = Self::new();
        for partition in Partition::ALL {
            for name in store.images(partition)? {
                snapshot.images[partition].insert(name);
            }
            for stem in store.label_stems(partition)? {
                snapshot.labels[partition].insert(stem);
            }
            snapshot.non_utf8[partition] = store.non_utf8_images(partition)?;
        }
        Ok(snapshot)
    }

    /// Adds an image, with a label for its stem when `labeled` is set.
    pub fn insert_sample(&mut self, partition: Partition, file_name: &str, labeled: bool) {
        self.images[partition].insert(file_name.to_string());
        if labeled {
            self.labels[partition].insert(file_stem(file_name).to_string());
        }
    }

    pub fn insert_image(&mut self, partition: Partition, file_name: &str) {
        self.images[partition].insert(file_name.to_string());
    }

    pub fn insert_label(&mut self, partition: Partition, stem: &str) {
        self.labels[partition].insert(stem.to_string());
    }

    /// Makes every move of this image fail.
    pub fn fail_image_moves(&mut self, file_name: &str) {
        self.failing_images.insert(file_name.to_string());
    }

    /// Makes every move of this label fail.
    pub fn fail_label_moves(&mut self, stem: &str) {
        self.failing_labels.insert(stem.to_string());
    }

    /// Clears all injected failures.
    pub fn heal(&mut self) {
        self.failing_images.clear();
        self.failing_labels.clear();
    }

    pub fn contains_image(&self, partition: Partition, file_name: &str) -> bool {
        self.images[partition].contains(file_name)
    }

    pub fn has_label(&self, partition: Partition, stem: &str) -> bool {
        self.labels[partition].contains(stem)
    }

    pub fn image_count(&self, partition: Partition) -> usize {
        self.images[partition].len()
    }

    /// Number of successful image and label moves so far.
    pub fn move_count(&self) -> usize {
        self.moves
    }
}

impl SampleStore for MemoryStore {
    fn images(&self, partition: Partition) -> Result<Vec<String>, PrepError> {
        Ok(self.images[partition].iter().cloned().collect())
    }

    fn non_utf8_images(&self, partition: Partition) -> Result<Vec<PathBuf>, PrepError> {
        Ok(self.non_utf8[partition].clone())
    }

    fn label_stems(&self, partition: Partition) -> Result<Vec<String>, PrepError> {
        Ok(self.labels[partition].iter().cloned().collect())
    }

    fn move_image(
        &mut self,
        file_name: &str,
        from: Partition,
        to: Partition,
    ) -> Result<(), PrepError> {
        if !self.images[from].contains(file_name) {
            return Err(PrepError::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no image '{file_name}' in {from}"),
            )));
        }
        if self.failing_images.contains(file_name) {
            return Err(PrepError::Io(io::Error::other(format!(
                "injected failure moving '{file_name}'"
            ))));
        }
        if self.images[to].contains(file_name) {
            return Err(PrepError::DestinationExists {
                path: PathBuf::from("images").join(to.as_str()).join(file_name),
            });
        }

        self.images[from].remove(file_name);
        self.images[to].insert(file_name.to_string());
        self.moves += 1;
        Ok(())
    }

    fn move_label(&mut self, stem: &str, from: Partition, to: Partition) -> Result<bool, PrepError> {
        if !self.labels[from].contains(stem) {
            return Ok(false);
        }
        if self.failing_labels.contains(stem) {
            return Err(PrepError::Io(io::Error::other(format!(
                "injected failure moving label '{stem}'"
            ))));
        }
        if self.labels[to].contains(stem) {
            return Err(PrepError::DestinationExists {
                path: PathBuf::from("labels")
                    .join(to.as_str())
                    .join(format!("{stem}.txt")),
            });
        }

        self.labels[from].remove(stem);
        self.labels[to].insert(stem.to_string());
        self.moves += 1;
        Ok(true)
    }
}
