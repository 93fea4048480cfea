//! Resume status: what a run over the same CSV would still have to do.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::aggregate::failure_log_path;
use crate::class_id::ClassId;
use crate::outcome::FailureKind;
use crate::skip::is_already_extracted;

/// Snapshot of progress for a list of identifiers under a target directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    /// Identifiers whose output directory is non-empty.
    pub completed: Vec<ClassId>,
    /// Everything else, in CSV order.
    pub pending: Vec<ClassId>,
    /// Pending identifiers that appear in the failure log, in first-logged order.
    pub failed: Vec<ClassId>,
}

impl StatusReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.pending.len()
    }

    pub fn completion_pct(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.completed.len() as f64 * 100.0 / total as f64,
        }
    }
}

/// Scans `target_dir` for the given identifiers. Never modifies anything.
pub fn scan(ids: &[ClassId], target_dir: &Path) -> io::Result<StatusReport> {
    let mut report = StatusReport::default();
    for id in ids {
        if is_already_extracted(target_dir, id) {
            report.completed.push(id.clone());
        } else {
            report.pending.push(id.clone());
        }
    }
    let pending: HashSet<&ClassId> = report.pending.iter().collect();
    report.failed = read_failure_log(&failure_log_path(target_dir))?
        .into_iter()
        .filter(|id| pending.contains(id))
        .collect();
    Ok(report)
}

/// Distinct identifiers named in a failure log, in first-seen order.
///
/// A missing log means nothing has failed. Lines without a `<id> - <Kind>: `
/// prefix, or whose identifier no longer validates, are ignored.
pub fn read_failure_log(path: &Path) -> io::Result<Vec<ClassId>> {
    let data = match fs::read_to_string(path) {
        Ok(d) => d,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for line in data.lines() {
        let Some(Ok(id)) = logged_id(line).map(ClassId::parse) else {
            continue;
        };
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Identifier part of a failure log line: everything before the first
/// ` - <Kind>: ` marker. Messages may contain ` - ` themselves.
fn logged_id(line: &str) -> Option<&str> {
    FailureKind::ALL
        .iter()
        .filter_map(|kind| line.find(&format!(" - {kind}: ")))
        .min()
        .map(|end| &line[..end])
}
