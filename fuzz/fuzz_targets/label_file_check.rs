//! Fuzz target for label file validation.
//!
//! Feeds arbitrary bytes through the same lossy UTF-8 decoding the
//! validator uses, checking for panics and inconsistent line numbers.

#![no_main]

use libfuzzer_sys::fuzz_target;
use platesplit::validation::check_label_text;

fuzz_target!(|data: &[u8]| {
    if data.len() > 10 * 1024 * 1024 {
        return;
    }

    let content = String::from_utf8_lossy(data);
    let non_blank = content.lines().filter(|l| !l.trim().is_empty()).count();

    for issue in check_label_text(&content, 3) {
        if let Some(line) = issue.line {
            assert!(line >= 1 && line <= non_blank);
        }
    }
});
