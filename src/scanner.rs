// src/scanner.rs
//
// Recursive directory enumeration for upload planning. Entries come out
// depth-first and lexicographically sorted at each level, so a tree scans
// in the same order on every run.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use walkdir::WalkDir;

/// One discovered filesystem entry. Directories are traversed, never
/// yielded, so `is_dir` is false for everything the scanner produces;
/// non-regular entries (symlinks etc.) are yielded and left to the
/// caller's regular-file check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Lazily enumerate the files under `root`, sorted by file name at each
/// directory level. A missing root, an unreadable directory, or a root
/// that is not a directory surfaces as an `Err` item.
pub fn scan_tree(root: &Path) -> impl Iterator<Item = Result<FileEntry>> {
    let root = root.to_path_buf();
    WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(e) if e.file_type().is_dir() => None,
            Ok(e) if e.depth() == 0 => {
                Some(Err(anyhow!("{} is not a directory", root.display())))
            }
            Ok(e) => Some(Ok(FileEntry {
                is_dir: e.file_type().is_dir(),
                path: e.into_path(),
            })),
            Err(e) => Some(Err(e.into())),
        })
}
