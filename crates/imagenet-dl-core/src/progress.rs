//! Progress events emitted by workers.
//!
//! Fetch and dispatch code only emit [`ProgressEvent`]s to a [`ProgressSink`];
//! rendering (terminal bars, plain logs) is entirely the sink's business and
//! never feeds back into outcome decisions.

use std::fmt;

use crate::class_id::ClassId;
use crate::outcome::OutcomeKind;

/// Display index of one concurrent worker. Carries no ownership semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorkerSlot(pub usize);

impl fmt::Display for WorkerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// The worker picked up a class that needs downloading.
    FetchStarted { slot: WorkerSlot, class_id: ClassId },
    /// A new HTTP attempt began; byte counts restart from zero.
    AttemptStarted { slot: WorkerSlot, attempt: u32 },
    /// Bytes received so far in the current attempt.
    Transferred {
        slot: WorkerSlot,
        bytes: u64,
        total: Option<u64>,
    },
    /// The archive is downloaded and being unpacked.
    Extracting { slot: WorkerSlot, class_id: ClassId },
    /// The class has a recorded outcome; the slot is free again.
    Finished {
        slot: WorkerSlot,
        class_id: ClassId,
        outcome: OutcomeKind,
    },
}

/// Receiver of progress events. Called concurrently from every worker thread.
pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_event(&self, _event: ProgressEvent) {}
}
