//! Already-extracted detection.
//!
//! A class counts as done when its output directory exists and holds at least
//! one entry. Partial extraction from an interrupted run is not detected;
//! failed extractions remove the directory so they are retried next run.

use std::fs;
use std::path::Path;

use crate::class_id::ClassId;

/// True if `<target_root>/<id>` is a non-empty directory.
pub fn is_already_extracted(target_root: &Path, id: &ClassId) -> bool {
    is_non_empty_dir(&target_root.join(id.as_str()))
}

/// True if `path` is a directory containing at least one entry.
///
/// Missing paths, plain files and unreadable directories are all "not done".
pub fn is_non_empty_dir(path: &Path) -> bool {
    match fs::read_dir(path) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    }
}
