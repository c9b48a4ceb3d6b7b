#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const PARTITIONS: [&str; 3] = ["train", "valid", "test"];

pub fn write_file(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, contents).expect("write file");
}

pub fn image_path(root: &Path, partition: &str, file_name: &str) -> PathBuf {
    root.join("images").join(partition).join(file_name)
}

pub fn label_path(root: &Path, partition: &str, stem: &str) -> PathBuf {
    root.join("labels").join(partition).join(format!("{stem}.txt"))
}

/// Writes `count` labeled images `img_000.jpg`.. into one partition.
pub fn seed_partition(root: &Path, partition: &str, count: usize) {
    for idx in 0..count {
        let stem = format!("img_{idx:03}");
        write_file(
            &image_path(root, partition, &format!("{stem}.jpg")),
            stem.as_bytes(),
        );
        write_file(
            &label_path(root, partition, &stem),
            format!("0 0.5 0.5 0.2 0.1 # {stem}\n").as_bytes(),
        );
    }
    for name in PARTITIONS {
        fs::create_dir_all(root.join("images").join(name)).expect("create images dir");
        fs::create_dir_all(root.join("labels").join(name)).expect("create labels dir");
    }
}

/// Sorted file names directly inside `dir`; empty when it does not exist.
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .map(|entry| entry.expect("read dir entry"))
        .filter(|entry| entry.path().is_file())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn image_count(root: &Path, partition: &str) -> usize {
    file_names(&root.join("images").join(partition)).len()
}

pub fn stem(file_name: &str) -> &str {
    file_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(file_name)
}
