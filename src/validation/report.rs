//! Validation report types for structured error reporting.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// The result of validating the label files of a dataset.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ValidationReport {
    /// Dataset root; paths are displayed relative to it.
    pub root: PathBuf,
    /// Number of label files read.
    pub files_checked: usize,
    /// Label files with at least one issue.
    pub invalid: Vec<InvalidLabel>,
}

impl ValidationReport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Returns true if every label file is valid.
    pub fn is_clean(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Total number of issues across all files.
    pub fn issue_count(&self) -> usize {
        self.invalid.iter().map(|entry| entry.issues.len()).sum()
    }

    fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation Summary")?;
        writeln!(f, "Label files checked: {}", self.files_checked)?;
        writeln!(f, "Total invalid files found: {}", self.invalid.len())?;

        if self.invalid.is_empty() {
            writeln!(f)?;
            return writeln!(f, "All label files are valid!");
        }

        for entry in &self.invalid {
            writeln!(f)?;
            writeln!(f, "[INVALID] {}", self.relative(&entry.label).display())?;
            for issue in &entry.issues {
                writeln!(f, "   - {}", issue)?;
            }
            match &entry.image {
                Some(image) => writeln!(f, "   → Image: {}", self.relative(image).display())?,
                None => writeln!(f, "   → Image not found.")?,
            }
        }

        Ok(())
    }
}

/// A label file that failed validation, with the image it belongs to.
#[derive(Clone, Debug, Serialize)]
pub struct InvalidLabel {
    pub label: PathBuf,
    pub image: Option<PathBuf>,
    pub issues: Vec<LabelIssue>,
}

/// A single problem in a label file.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelIssue {
    /// A stable code for the issue type.
    pub code: IssueCode,
    /// 1-based position among the file's non-blank lines, if line-specific.
    pub line: Option<usize>,
    /// A human-readable description of the issue.
    pub message: String,
}

impl LabelIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            line: None,
            message: message.into(),
        }
    }

    /// Attaches a line number.
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for LabelIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "Line {}: {}", line, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// A stable code identifying the type of label issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum IssueCode {
    /// The file has no non-blank lines.
    EmptyFile,
    /// A line does not have exactly five tokens.
    WrongTokenCount,
    /// The class id is not an integer.
    ClassIdNotInteger,
    /// The class id is outside `[0, num_classes - 1]`.
    ClassIdOutOfRange,
    /// A coordinate does not parse as a number.
    CoordinateNotNumeric,
    /// A coordinate is outside `[0, 1]`.
    CoordinateOutOfRange,
}

/// What [`delete_invalid`](super::delete_invalid) removed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct DeletionReport {
    pub deleted_labels: Vec<PathBuf>,
    pub deleted_images: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl fmt::Display for DeletionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Deleted {} label(s) and {} image(s)",
            self.deleted_labels.len(),
            self.deleted_images.len()
        )?;
        for error in &self.errors {
            writeln!(f, "  Error deleting: {}", error)?;
        }
        Ok(())
    }
}
