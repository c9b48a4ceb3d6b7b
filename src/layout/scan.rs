//! Directory scanning helpers.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::PrepError;

/// Matching files directly inside one directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirListing {
    /// UTF-8 file names, sorted.
    pub names: Vec<String>,
    /// Matching files whose name is not valid UTF-8, sorted.
    pub non_utf8: Vec<PathBuf>,
}

/// Scans the files directly inside `dir` whose extension is in `extensions`
/// (case-insensitive).
///
/// A missing directory yields an empty listing. Directories and symlinks
/// whose target does not exist are skipped.
pub fn scan_dir(dir: &Path, extensions: &[&str]) -> Result<DirListing, PrepError> {
    let mut listing = DirListing::default();
    if !dir.is_dir() {
        return Ok(listing);
    }

    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|source| PrepError::Walk {
            path: dir.to_path_buf(),
            source,
        })?;

        // `Path::is_file` follows symlinks and is false for dangling ones.
        if !entry.path().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }

        match entry.file_name().to_str() {
            Some(name) => listing.names.push(name.to_string()),
            None => listing.non_utf8.push(entry.into_path()),
        }
    }

    listing.names.sort();
    listing.non_utf8.sort();
    Ok(listing)
}

/// Sorted names of the matching files directly inside `dir`.
///
/// Files with non UTF-8 names are left out with a warning; use [`scan_dir`]
/// to get them.
pub fn list_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
) -> Result<Vec<String>, PrepError> {
    let listing = scan_dir(dir, extensions)?;
    for path in &listing.non_utf8 {
        warn!("Skipping {:?}: file name is not valid UTF-8", path);
    }
    Ok(listing.names)
}

/// Counts every regular file below `root`, recursively.
pub fn count_files(root: &Path) -> Result<usize, PrepError> {
    let mut total = 0;

    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| PrepError::Walk {
            path: root.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file() {
            total += 1;
        }
    }

    Ok(total)
}

/// Returns true if `path` has one of the `allowed` extensions, ignoring case.
pub fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn list_files_filters_by_extension_case_insensitively() {
        let temp = tempfile::tempdir().expect("create temp dir");
        for name in ["b.JPG", "a.png", "c.txt", "d.jpeg", "e"] {
            fs::write(temp.path().join(name), b"x").expect("write file");
        }
        fs::create_dir(temp.path().join("nested.jpg")).expect("create dir");

        let names = list_files_with_extensions(temp.path(), &["jpg", "jpeg", "png"])
            .expect("list files");
        assert_eq!(names, vec!["a.png", "b.JPG", "d.jpeg"]);
    }

    #[test]
    fn list_files_treats_missing_dir_as_empty() {
        let temp = tempfile::tempdir().expect("create temp dir");
        let names = list_files_with_extensions(&temp.path().join("missing"), &["jpg"])
            .expect("list files");
        assert!(names.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn list_files_skips_dangling_symlinks() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("real.jpg"), b"x").expect("write file");
        std::os::unix::fs::symlink(temp.path().join("gone.jpg"), temp.path().join("link.jpg"))
            .expect("create symlink");

        let names = list_files_with_extensions(temp.path(), &["jpg"]).expect("list files");
        assert_eq!(names, vec!["real.jpg"]);
    }

    #[cfg(unix)]
    #[test]
    fn scan_dir_reports_non_utf8_names() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempfile::tempdir().expect("create temp dir");
        let odd = temp.path().join(OsStr::from_bytes(b"pl\xffate.jpg"));
        fs::write(temp.path().join("ok.jpg"), b"x").expect("write file");
        fs::write(&odd, b"x").expect("write file");

        let listing = scan_dir(temp.path(), &["jpg"]).expect("scan dir");
        assert_eq!(listing.names, vec!["ok.jpg"]);
        assert_eq!(listing.non_utf8, vec![odd]);

        let names = list_files_with_extensions(temp.path(), &["jpg"]).expect("list files");
        assert_eq!(names, vec!["ok.jpg"]);
    }

    #[test]
    fn count_files_walks_recursively() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(temp.path().join("images/train")).expect("create dirs");
        fs::create_dir_all(temp.path().join("labels/train")).expect("create dirs");
        fs::write(temp.path().join("images/train/a.jpg"), b"x").expect("write");
        fs::write(temp.path().join("labels/train/a.txt"), b"x").expect("write");
        fs::write(temp.path().join("README"), b"x").expect("write");

        assert_eq!(count_files(temp.path()).expect("count"), 3);
    }
}
