//! Result aggregation shared by all workers.
//!
//! Every outcome goes through [`Aggregator::record`], which updates the
//! tallies and appends failures to the failure log under one lock, so the
//! counters and the log can never disagree and log lines never interleave.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::class_id::ClassId;
use crate::outcome::{Failure, Outcome};

/// Name of the failure log inside the target directory.
pub const FAILURE_LOG_NAME: &str = "failed_downloads.log";

/// Final tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Failed identifiers in the order they were recorded.
    pub failures: Vec<(ClassId, Failure)>,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.success + self.skipped + self.failed
    }
}

#[derive(Debug, Default)]
struct Inner {
    summary: RunSummary,
    log_path: Option<PathBuf>,
    /// Opened on the first failure.
    log: Option<File>,
}

impl Inner {
    fn append_failure(&mut self, id: &ClassId, failure: &Failure) {
        let Some(path) = self.log_path.as_deref() else {
            return;
        };
        if self.log.is_none() {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => self.log = Some(f),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "cannot open failure log: {}", e);
                    return;
                }
            }
        }
        if let Some(log) = self.log.as_mut() {
            // One write per line so a concurrent reader never sees half an entry.
            let line = format_failure_line(id, failure);
            if let Err(e) = log.write_all(line.as_bytes()) {
                tracing::warn!(path = %path.display(), wnid = %id, "cannot append to failure log: {}", e);
            }
        }
    }
}

/// Thread-safe outcome collector. Share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Aggregator {
    inner: Mutex<Inner>,
}

impl Aggregator {
    /// Aggregator that only counts (no failure log).
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregator that also appends each failure to `path`.
    pub fn with_failure_log(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                log_path: Some(path.into()),
                ..Inner::default()
            }),
        }
    }

    /// Records the outcome for one identifier.
    pub fn record(&self, id: &ClassId, outcome: Outcome) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            Outcome::Success => inner.summary.success += 1,
            Outcome::Skipped => inner.summary.skipped += 1,
            Outcome::Failed(failure) => {
                inner.summary.failed += 1;
                inner.append_failure(id, &failure);
                inner.summary.failures.push((id.clone(), failure));
            }
        }
    }

    /// Snapshot of the tallies so far; call after all workers have joined.
    pub fn finalize(&self) -> RunSummary {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(log) = inner.log.as_mut() {
            if let Err(e) = log.flush() {
                tracing::warn!("cannot flush failure log: {}", e);
            }
        }
        inner.summary.clone()
    }
}

/// `<id> - <Kind>: <message>` plus newline. Newlines in the message are flattened.
pub fn format_failure_line(id: &ClassId, failure: &Failure) -> String {
    let message = failure.message.replace(['\r', '\n'], " ");
    format!("{} - {}: {}\n", id, failure.kind, message)
}

/// Path of the failure log under `target_dir`.
pub fn failure_log_path(target_dir: &Path) -> PathBuf {
    target_dir.join(FAILURE_LOG_NAME)
}
