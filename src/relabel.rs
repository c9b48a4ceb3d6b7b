//! Class filtering for YOLO label files.
//!
//! Keeps only annotations whose class id is in a chosen set. Every kept line
//! is rewritten to class `0`; with `renumber` the kept classes instead become
//! `0..n` in ascending order of their old ids.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::PrepError;
use crate::layout::{list_files_with_extensions, LABEL_EXTENSION};

/// Outcome of relabeling one directory.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RelabelReport {
    pub files: Vec<RelabeledFile>,
    /// Files left untouched because a line could not be parsed.
    pub skipped: Vec<SkippedFile>,
}

impl RelabelReport {
    pub fn lines_kept(&self) -> usize {
        self.files.iter().map(|f| f.kept).sum()
    }

    pub fn lines_dropped(&self) -> usize {
        self.files.iter().map(|f| f.dropped).sum()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RelabeledFile {
    pub path: PathBuf,
    pub kept: usize,
    pub dropped: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub message: String,
}

/// Maps each kept class id to its new id: `0` for all of them, or their rank
/// in `keep` when `renumber` is set.
pub fn class_mapping(keep: &BTreeSet<usize>, renumber: bool) -> BTreeMap<usize, usize> {
    keep.iter()
        .enumerate()
        .map(|(rank, old_id)| (*old_id, if renumber { rank } else { 0 }))
        .collect()
}

/// Filters and renumbers the lines of one label file's contents.
///
/// Returns the new contents with the number of kept and dropped lines. Blank
/// lines are removed without being counted. A negative class id is never
/// kept; a class id that is not an integer is an error.
pub fn relabel_text(
    content: &str,
    mapping: &BTreeMap<usize, usize>,
    path: &Path,
) -> Result<(String, usize, usize), PrepError> {
    let mut output = String::new();
    let mut kept = 0;
    let mut dropped = 0;

    for (line_idx, line) in content.lines().enumerate() {
        let mut parts = line.split_whitespace();
        let Some(class_token) = parts.next() else {
            continue;
        };

        let class_id = class_token
            .parse::<i64>()
            .map_err(|_| PrepError::LabelParse {
                path: path.to_path_buf(),
                line: line_idx + 1,
                message: format!("class ID '{class_token}' is not an integer"),
            })?;

        let new_id = usize::try_from(class_id)
            .ok()
            .and_then(|id| mapping.get(&id));

        match new_id {
            Some(new_id) => {
                output.push_str(&new_id.to_string());
                for part in parts {
                    output.push(' ');
                    output.push_str(part);
                }
                output.push('\n');
                kept += 1;
            }
            None => dropped += 1,
        }
    }

    Ok((output, kept, dropped))
}

/// Rewrites one label file in place.
pub fn relabel_file(
    path: &Path,
    mapping: &BTreeMap<usize, usize>,
) -> Result<RelabeledFile, PrepError> {
    let content = fs::read_to_string(path).map_err(PrepError::Io)?;
    let (output, kept, dropped) = relabel_text(&content, mapping, path)?;
    fs::write(path, output).map_err(PrepError::Io)?;

    debug!("Relabeled {:?}: kept {}, dropped {}", path, kept, dropped);

    Ok(RelabeledFile {
        path: path.to_path_buf(),
        kept,
        dropped,
    })
}

/// Relabels every `.txt` file directly inside `dir`, in name order.
///
/// A file with an unparseable class id or non UTF-8 contents is skipped and
/// reported; the rest of the directory is still processed.
pub fn relabel_dir(
    dir: &Path,
    keep: &BTreeSet<usize>,
    renumber: bool,
) -> Result<RelabelReport, PrepError> {
    if !dir.is_dir() {
        return Err(PrepError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("label directory {} does not exist", dir.display()),
        )));
    }

    let mapping = class_mapping(keep, renumber);
    let mut report = RelabelReport::default();

    for name in list_files_with_extensions(dir, &[LABEL_EXTENSION])? {
        let path = dir.join(&name);
        match relabel_file(&path, &mapping) {
            Ok(file) => report.files.push(file),
            Err(err @ PrepError::LabelParse { .. }) => {
                warn!("Skipping {:?}: {}", path, err);
                report.skipped.push(SkippedFile {
                    path,
                    message: err.to_string(),
                });
            }
            Err(PrepError::Io(err)) if err.kind() == io::ErrorKind::InvalidData => {
                warn!("Skipping {:?}: not UTF-8 text", path);
                report.skipped.push(SkippedFile {
                    message: format!("{}: not UTF-8 text ({})", path.display(), err),
                    path,
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(report)
}

impl fmt::Display for RelabelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Relabeled {} file(s): kept {} annotation(s), dropped {}",
            self.files.len(),
            self.lines_kept(),
            self.lines_dropped()
        )?;

        if !self.skipped.is_empty() {
            writeln!(f)?;
            writeln!(f, "Skipped ({}):", self.skipped.len())?;
            for skipped in &self.skipped {
                writeln!(f, "  - {}", skipped.message)?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep(ids: &[usize]) -> BTreeSet<usize> {
        ids.iter().copied().collect()
    }

    #[test]
    fn single_kept_class_becomes_zero() {
        let mapping = class_mapping(&keep(&[1]), false);
        let (output, kept, dropped) = relabel_text(
            "0 0.1 0.1 0.2 0.2\n1 0.5 0.5 0.3 0.3\n\n2 0.4 0.4 0.1 0.1\n",
            &mapping,
            Path::new("a.txt"),
        )
        .expect("relabel");

        assert_eq!(output, "0 0.5 0.5 0.3 0.3\n");
        assert_eq!((kept, dropped), (1, 2));
    }

    #[test]
    fn multiple_kept_classes_all_become_zero() {
        let mapping = class_mapping(&keep(&[3, 1]), false);
        let (output, kept, dropped) = relabel_text(
            "3  0.5 0.5 0.1 0.1\n1 0.2 0.2 0.1 0.1\n-1 0.2 0.2 0.1 0.1\n",
            &mapping,
            Path::new("a.txt"),
        )
        .expect("relabel");
        assert_eq!(output, "0 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1\n");
        assert_eq!((kept, dropped), (2, 1));
    }

    #[test]
    fn renumber_maps_kept_classes_by_rank() {
        let mapping = class_mapping(&keep(&[3, 1]), true);
        assert_eq!(mapping.get(&1), Some(&0));
        assert_eq!(mapping.get(&3), Some(&1));

        let (output, _, _) = relabel_text(
            "3  0.5 0.5 0.1 0.1\n1 0.2 0.2 0.1 0.1\n",
            &mapping,
            Path::new("a.txt"),
        )
        .expect("relabel");
        assert_eq!(output, "1 0.5 0.5 0.1 0.1\n0 0.2 0.2 0.1 0.1\n");
    }

    #[test]
    fn non_integer_class_is_an_error() {
        let err = relabel_text(
            "car 0.5 0.5 0.1 0.1\n",
            &class_mapping(&keep(&[0]), false),
            Path::new("a.txt"),
        )
        .unwrap_err();
        assert!(matches!(err, PrepError::LabelParse { line: 1, .. }));
    }

    #[test]
    fn relabel_dir_rewrites_files_and_skips_bad_ones() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("a.txt"), "1 0.5 0.5 0.1 0.1\n0 0.5 0.5 0.1 0.1\n")
            .expect("write");
        fs::write(temp.path().join("b.txt"), "x 0.5 0.5 0.1 0.1\n").expect("write");
        fs::write(temp.path().join("c.txt"), "0 0.5 0.5 0.1 0.1\n").expect("write");
        fs::write(temp.path().join("notes.md"), "1 untouched\n").expect("write");

        let report = relabel_dir(temp.path(), &keep(&[1]), false).expect("relabel dir");

        assert_eq!(report.files.len(), 2);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("a.txt")).expect("read"),
            "0 0.5 0.5 0.1 0.1\n"
        );
        assert_eq!(
            fs::read_to_string(temp.path().join("b.txt")).expect("read"),
            "x 0.5 0.5 0.1 0.1\n"
        );
        assert_eq!(fs::read_to_string(temp.path().join("c.txt")).expect("read"), "");
        assert_eq!(
            fs::read_to_string(temp.path().join("notes.md")).expect("read"),
            "1 untouched\n"
        );
    }

    #[test]
    fn relabel_dir_requires_existing_dir() {
        let temp = tempfile::tempdir().expect("create temp dir");
        assert!(relabel_dir(&temp.path().join("missing"), &keep(&[0]), false).is_err());
    }

    #[test]
    fn non_utf8_label_is_skipped_and_later_files_still_processed() {
        let temp = tempfile::tempdir().expect("create temp dir");
        fs::write(temp.path().join("a.txt"), b"0 0.5 0.5 0.1 0.1\xff\n").expect("write");
        fs::write(temp.path().join("b.txt"), "2 0.5 0.5 0.1 0.1\n").expect("write");

        let report = relabel_dir(temp.path(), &keep(&[2]), false).expect("relabel dir");

        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].path, temp.path().join("a.txt"));
        assert!(report.skipped[0].message.contains("not UTF-8"));
        assert_eq!(report.files.len(), 1);
        assert_eq!(
            fs::read_to_string(temp.path().join("b.txt")).expect("read"),
            "0 0.5 0.5 0.1 0.1\n"
        );
        assert_eq!(
            fs::read(temp.path().join("a.txt")).expect("read"),
            b"0 0.5 0.5 0.1 0.1\xff\n"
        );
    }
}
