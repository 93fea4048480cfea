//! Per-class outcomes and the error kinds a failed class is reported under.

use std::fmt;
use thiserror::Error;

use crate::extract::ExtractError;
use crate::retry::{FetchError, RetryFailure};

/// Category a failure is reported under in the failure log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Timeouts, resets, 429/5xx that survived every retry.
    TransientNetwork,
    /// 404 and other non-retryable HTTP statuses, DNS failure, malformed URL.
    TerminalNetwork,
    /// Corrupt archive, unsafe entry path, write failure while unpacking.
    Extraction,
    /// Local filesystem failure outside extraction (permissions, disk full while fetching).
    Filesystem,
    /// A panic while processing the class.
    Internal,
}

impl FailureKind {
    pub const ALL: [FailureKind; 5] = [
        FailureKind::TransientNetwork,
        FailureKind::TerminalNetwork,
        FailureKind::Extraction,
        FailureKind::Filesystem,
        FailureKind::Internal,
    ];
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FailureKind::TransientNetwork => "TransientNetworkError",
            FailureKind::TerminalNetwork => "TerminalNetworkError",
            FailureKind::Extraction => "ExtractionError",
            FailureKind::Filesystem => "FilesystemError",
            FailureKind::Internal => "InternalError",
        })
    }
}

/// Why a class failed, in human-readable form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of processing one class. Exactly one per identifier per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Skipped,
    Failed(Failure),
}

/// Outcome without the failure payload, for progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Skipped,
    Failed,
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success => OutcomeKind::Success,
            Outcome::Skipped => OutcomeKind::Skipped,
            Outcome::Failed(_) => OutcomeKind::Failed,
        }
    }
}

/// Error raised while processing a single class.
#[derive(Debug, Error)]
pub enum ClassError {
    #[error(transparent)]
    Fetch(#[from] RetryFailure),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error("{context}: {source}")]
    Filesystem {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ClassError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClassError::Fetch(f) => match f.error {
                FetchError::Storage(_) => FailureKind::Filesystem,
                _ if f.exhausted() => FailureKind::TransientNetwork,
                _ => FailureKind::TerminalNetwork,
            },
            ClassError::Extract(_) => FailureKind::Extraction,
            ClassError::Filesystem { .. } => FailureKind::Filesystem,
        }
    }
}

impl From<ClassError> for Failure {
    fn from(e: ClassError) -> Self {
        Failure {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}
