//! Per-class work items and the on-disk paths they use.

use std::path::{Path, PathBuf};

use crate::class_id::ClassId;
use crate::url_model::UrlTemplate;

/// One class to fetch and extract.
///
/// Every path lives directly under the target root and is derived from the
/// validated identifier, so no two tasks in a run share a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    pub class_id: ClassId,
    pub url: String,
    /// `<target>/<id>`: extraction destination.
    pub class_dir: PathBuf,
    /// `<target>/<id>.tar`: downloaded archive.
    pub archive_path: PathBuf,
}

impl DownloadTask {
    pub fn plan(class_id: ClassId, template: &UrlTemplate, target_root: &Path) -> Self {
        let url = template.archive_url(&class_id);
        let class_dir = target_root.join(class_id.as_str());
        let archive_path = target_root.join(format!("{}.tar", class_id));
        Self {
            class_id,
            url,
            class_dir,
            archive_path,
        }
    }

    /// Where the archive is written while the transfer is in flight.
    pub fn temp_path(&self) -> PathBuf {
        temp_path(&self.archive_path)
    }
}

/// Returns `<final_path>.part`.
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(".part");
    PathBuf::from(o)
}
