use std::path::PathBuf;
use thiserror::Error;

use crate::split::RebalanceReport;

/// The main error type for platesplit operations.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed while traversing {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Failed to parse label file {path} at line {line}: {message}")]
    LabelParse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Refusing to overwrite existing file {path}")]
    DestinationExists { path: PathBuf },

    #[error("Failed to move {from} to {to}: {source}")]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Split finished with {failed} failed move(s)")]
    SplitIncomplete {
        failed: usize,
        report: Box<RebalanceReport>,
    },

    #[error("Failed to delete {failed} file(s)")]
    DeletionFailed { failed: usize },

    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),

    #[error("Failed to write JSON report: {source}")]
    JsonWrite {
        #[source]
        source: serde_json::Error,
    },
}
