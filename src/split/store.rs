//! Sample storage behind the rebalancer.
//!
//! The rebalancer only needs to list samples and move them between
//! partitions. [`FsStore`] does that on a real dataset directory;
//! [`MemoryStore`](super::MemoryStore) does it in memory.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::SplitConfig;
use crate::error::PrepError;
use crate::layout::{
    file_stem, list_files_with_extensions, scan_dir, DatasetLayout, DirListing, Partition,
    LABEL_EXTENSION,
};

/// Where samples live and how they move.
pub trait SampleStore {
    /// Image file names in `partition`, sorted by name.
    fn images(&self, partition: Partition) -> Result<Vec<String>, PrepError>;

    /// Image files in `partition` whose names are not valid UTF-8. They are
    /// not listed by [`images`](SampleStore::images) and cannot be moved.
    fn non_utf8_images(&self, partition: Partition) -> Result<Vec<PathBuf>, PrepError>;

    /// Stems of the label files in `partition`, sorted.
    fn label_stems(&self, partition: Partition) -> Result<Vec<String>, PrepError>;

    /// Moves one image file, keeping its name.
    fn move_image(&mut self, file_name: &str, from: Partition, to: Partition)
        -> Result<(), PrepError>;

    /// Moves the label for `stem`, if there is one. Returns `Ok(false)` when
    /// `from` holds no label for `stem`.
    fn move_label(&mut self, stem: &str, from: Partition, to: Partition) -> Result<bool, PrepError>;
}

/// A dataset directory on disk.
#[derive(Clone, Debug)]
pub struct FsStore {
    layout: DatasetLayout,
    extensions: Vec<String>,
}

impl FsStore {
    pub fn new(layout: DatasetLayout, extensions: Vec<String>) -> Self {
        Self { layout, extensions }
    }

    pub fn from_config(config: &SplitConfig) -> Self {
        Self::new(
            DatasetLayout::new(&config.dataset_root),
            config.extensions.clone(),
        )
    }

    pub fn layout(&self) -> &DatasetLayout {
        &self.layout
    }

    fn scan_images(&self, partition: Partition) -> Result<DirListing, PrepError> {
        let extensions: Vec<&str> = self.extensions.iter().map(String::as_str).collect();
        scan_dir(&self.layout.images_dir(partition), &extensions)
    }
}

impl SampleStore for FsStore {
    fn images(&self, partition: Partition) -> Result<Vec<String>, PrepError> {
        Ok(self.scan_images(partition)?.names)
    }

    fn non_utf8_images(&self, partition: Partition) -> Result<Vec<PathBuf>, PrepError> {
        Ok(self.scan_images(partition)?.non_utf8)
    }

    fn label_stems(&self, partition: Partition) -> Result<Vec<String>, PrepError> {
        let names =
            list_files_with_extensions(&self.layout.labels_dir(partition), &[LABEL_EXTENSION])?;
        Ok(names
            .iter()
            .map(|name| file_stem(name).to_string())
            .collect())
    }

    fn move_image(
        &mut self,
        file_name: &str,
        from: Partition,
        to: Partition,
    ) -> Result<(), PrepError> {
        let src = self.layout.images_dir(from).join(file_name);
        let dst = self.layout.images_dir(to).join(file_name);
        move_file(&src, &dst)
    }

    fn move_label(&mut self, stem: &str, from: Partition, to: Partition) -> Result<bool, PrepError> {
        let src = self.layout.label_path(from, stem);
        if !src.is_file() {
            return Ok(false);
        }
        let dst = self.layout.label_path(to, stem);
        move_file(&src, &dst)?;
        Ok(true)
    }
}

/// Moves `src` to `dst`, never overwriting an existing file.
///
/// Tries a rename first and falls back to copy + remove, which also works
/// across filesystems.
pub fn move_file(src: &Path, dst: &Path) -> Result<(), PrepError> {
    if dst.exists() {
        return Err(PrepError::DestinationExists {
            path: dst.to_path_buf(),
        });
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(PrepError::Io)?;
    }

    debug!("Moving {:?} to {:?}", src, dst);

    let rename_err = match fs::rename(src, dst) {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };

    if !src.is_file() {
        return Err(PrepError::MoveFailed {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: rename_err,
        });
    }

    debug!("Rename failed ({}), falling back to copy", rename_err);

    fs::copy(src, dst).map_err(|source| PrepError::MoveFailed {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    })?;

    if let Err(source) = fs::remove_file(src) {
        warn!("Failed to remove {:?} after copy, undoing copy", src);
        let _ = fs::remove_file(dst);
        return Err(PrepError::MoveFailed {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source,
        });
    }

    Ok(())
}
