//! Per-partition image counts for a dataset root.

use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::error::PrepError;
use crate::layout::{scan_dir, DatasetLayout, Partition};
use crate::split::percent;

/// Image counts per partition; `None` marks a missing partition directory.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SplitSummary {
    pub entries: Vec<SummaryEntry>,
    pub total: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub partition: Partition,
    pub images: Option<usize>,
}

/// Counts the images under `<root>/images/<partition>` for every partition.
///
/// Files with non UTF-8 names are counted too.
pub fn split_summary(root: &Path, extensions: &[&str]) -> Result<SplitSummary, PrepError> {
    let layout = DatasetLayout::new(root);
    let mut entries = Vec::with_capacity(Partition::ALL.len());
    let mut total = 0;

    for partition in Partition::ALL {
        let dir = layout.images_dir(partition);
        let images = if dir.is_dir() {
            let listing = scan_dir(&dir, extensions)?;
            let count = listing.names.len() + listing.non_utf8.len();
            total += count;
            Some(count)
        } else {
            None
        };
        entries.push(SummaryEntry { partition, images });
    }

    Ok(SplitSummary { entries, total })
}

impl fmt::Display for SplitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Split Summary:")?;
        writeln!(f)?;

        for entry in &self.entries {
            let name = capitalize(entry.partition.as_str());
            match entry.images {
                Some(count) => writeln!(
                    f,
                    "{:<6} → {:>4} images ({:5.1}%)",
                    name,
                    count,
                    percent(count, self.total)
                )?,
                None => writeln!(f, "{:<6} → Folder not found", name)?,
            }
        }

        writeln!(f)?;
        writeln!(f, "Total images: {}", self.total)
    }
}

fn capitalize(raw: &str) -> String {
    let mut chars = raw.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
