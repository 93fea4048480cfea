//! Retry loop as an explicit state machine.
//!
//! ```text
//! Attempting(n) --ok--> Succeeded
//! Attempting(n) --err, transient, n < max--> Backoff(n) --sleep--> Attempting(n+1)
//! Attempting(n) --err, transient, n == max--> ExhaustedRetries
//! Attempting(n) --err, not transient--> TerminalFailure
//! ```

use std::time::Duration;
use thiserror::Error;

use super::classify;
use super::error::FetchError;
use super::policy::{ErrorKind, RetryDecision, RetryPolicy};

/// State a fetch moves to after a failed attempt.
///
/// `Attempting` is the call to the attempt closure itself and `Succeeded` is
/// the `Ok(Attempted)` it produces, so neither needs a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Backoff { attempt: u32, delay: Duration },
    ExhaustedRetries { attempts: u32 },
    TerminalFailure { attempts: u32 },
}

impl RetryState {
    /// Transition out of attempt `attempt` after a failure of the given kind.
    pub fn after_failure(policy: &RetryPolicy, attempt: u32, kind: ErrorKind) -> Self {
        match policy.decide(attempt, kind) {
            RetryDecision::RetryAfter(delay) => RetryState::Backoff { attempt, delay },
            RetryDecision::NoRetry if kind.is_transient() => {
                RetryState::ExhaustedRetries { attempts: attempt }
            }
            RetryDecision::NoRetry => RetryState::TerminalFailure { attempts: attempt },
        }
    }
}

/// Successful result plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// A retry loop that ended without success.
#[derive(Debug, Error)]
#[error("{error} (after {} attempt(s))", self.attempts())]
pub struct RetryFailure {
    /// Either `ExhaustedRetries` or `TerminalFailure`.
    pub state: RetryState,
    /// Error of the last attempt.
    #[source]
    pub error: FetchError,
}

impl RetryFailure {
    pub fn attempts(&self) -> u32 {
        match self.state {
            RetryState::Backoff { attempt, .. } => attempt,
            RetryState::ExhaustedRetries { attempts } | RetryState::TerminalFailure { attempts } => {
                attempts
            }
        }
    }

    /// True when the last error was transient and the attempt budget ran out.
    pub fn exhausted(&self) -> bool {
        matches!(self.state, RetryState::ExhaustedRetries { .. })
    }
}

/// Runs `f` until it succeeds or the policy says to stop.
///
/// `f` receives the 1-based attempt number. On a retryable failure the
/// calling thread sleeps for the backoff duration, then tries again.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, mut f: F) -> Result<Attempted<T>, RetryFailure>
where
    F: FnMut(u32) -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        let error = match f(attempt) {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: attempt,
                })
            }
            Err(e) => e,
        };
        let kind = classify::classify(&error);
        match RetryState::after_failure(policy, attempt, kind) {
            RetryState::Backoff { delay, .. } => {
                tracing::debug!(attempt, ?kind, %error, ?delay, "attempt failed, backing off");
                std::thread::sleep(delay);
                attempt += 1;
            }
            state => return Err(RetryFailure { state, error }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
        }
    }

    #[test]
    fn succeeds_after_two_throttled_attempts() {
        let calls = Cell::new(0u32);
        let res = run_with_retry(&fast_policy(3), |attempt| {
            calls.set(calls.get() + 1);
            assert_eq!(attempt, calls.get());
            if attempt < 3 {
                Err(FetchError::Http(503))
            } else {
                Ok("archive")
            }
        })
        .unwrap();
        assert_eq!(res.value, "archive");
        assert_eq!(res.attempts, 3);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn exhausts_after_max_attempts() {
        let calls = Cell::new(0u32);
        let err = run_with_retry::<(), _>(&fast_policy(3), |_| {
            calls.set(calls.get() + 1);
            Err(FetchError::Http(503))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 3);
        assert!(err.exhausted());
        assert_eq!(err.state, RetryState::ExhaustedRetries { attempts: 3 });
        assert!(matches!(err.error, FetchError::Http(503)));
    }

    #[test]
    fn not_found_is_terminal_after_one_attempt() {
        let calls = Cell::new(0u32);
        let err = run_with_retry::<(), _>(&fast_policy(3), |_| {
            calls.set(calls.get() + 1);
            Err(FetchError::Http(404))
        })
        .unwrap_err();
        assert_eq!(calls.get(), 1);
        assert_eq!(err.state, RetryState::TerminalFailure { attempts: 1 });
        assert!(!err.exhausted());
    }

    #[test]
    fn transitions_follow_policy() {
        let p = fast_policy(2);
        assert!(matches!(
            RetryState::after_failure(&p, 1, ErrorKind::Timeout),
            RetryState::Backoff { attempt: 1, .. }
        ));
        assert_eq!(
            RetryState::after_failure(&p, 2, ErrorKind::Timeout),
            RetryState::ExhaustedRetries { attempts: 2 }
        );
        assert_eq!(
            RetryState::after_failure(&p, 1, ErrorKind::Other),
            RetryState::TerminalFailure { attempts: 1 }
        );
    }

    #[test]
    fn failure_message_includes_attempts() {
        let err = run_with_retry::<(), _>(&fast_policy(2), |_| Err(FetchError::Http(502)))
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502 (after 2 attempt(s))");
    }
}
