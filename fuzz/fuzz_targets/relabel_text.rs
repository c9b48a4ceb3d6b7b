//! Fuzz target for class relabeling.
//!
//! Kept lines must never outnumber the input lines.

#![no_main]

use std::collections::BTreeSet;
use std::path::Path;

use libfuzzer_sys::fuzz_target;
use platesplit::relabel::{class_mapping, relabel_text};

fuzz_target!(|data: &[u8]| {
    let Ok(content) = std::str::from_utf8(data) else {
        return;
    };

    let keep: BTreeSet<usize> = [0, 3].into_iter().collect();
    let mapping = class_mapping(&keep, data.first().is_some_and(|b| b & 1 == 1));

    if let Ok((output, kept, dropped)) = relabel_text(content, &mapping, Path::new("fuzz.txt")) {
        assert_eq!(output.lines().count(), kept);
        assert!(kept + dropped <= content.lines().count());
    }
});
