//! Archive path-traversal guard.

use std::path::{Component, Path, PathBuf};

/// Returns `raw` as a relative path made only of normal components, or
/// `None` when it is absolute or climbs out via `..`.
///
/// `.` components are dropped, so `./a/./b` becomes `a/b` and `./` becomes
/// the empty path (the destination directory itself).
pub fn confine(raw: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(out)
}
