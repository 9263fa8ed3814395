//! Filesystem search for companion test files.

use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

/// Find the first file named `file_name` anywhere under `root`.
///
/// Traversal is depth-first with entries sorted by name, `.git` is skipped,
/// and the walk stops at the first hit. Unreadable entries are ignored.
pub fn find_companion_test(root: &Path, file_name: &str) -> Option<PathBuf> {
    let found = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != ".git")
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name() == file_name)
        .map(walkdir::DirEntry::into_path);
    debug!(root = %root.display(), file_name, found = ?found, "companion search");
    found
}
