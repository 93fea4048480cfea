//! Retry and backoff policy.
//!
//! This module encapsulates error classification (timeouts, throttling,
//! connection failures) and exponential backoff decisions. The retry loop is
//! an explicit state machine: each failed attempt is classified and moves the
//! fetch to `Backoff`, `ExhaustedRetries` or `TerminalFailure`.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{classify, classify_curl_error, classify_http_status};
pub use error::FetchError;
pub use policy::{ErrorKind, RetryDecision, RetryPolicy};
pub use run::{run_with_retry, Attempted, RetryFailure, RetryState};
