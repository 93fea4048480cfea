//! Archive fetcher: HTTP GET of one archive into a local file.
//!
//! Each worker owns one [`Fetcher`] and therefore one curl `Easy` handle.
//! libcurl keeps the connection cache on the handle, so sequential fetches
//! from the same worker reuse open connections to the archive host.
//!
//! Every attempt streams into `<archive>.part`, truncating it first. Only a
//! complete, 2xx, length-checked body is renamed to the final archive path;
//! on failure the temp file is removed.

use std::cell::Cell;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use curl::easy::{Easy, List};

use crate::progress::{ProgressEvent, ProgressSink, WorkerSlot};
use crate::retry::{run_with_retry, Attempted, FetchError, RetryFailure, RetryPolicy};

/// Abort a transfer that stays below this many bytes/sec for `stall_timeout`.
const LOW_SPEED_LIMIT: u32 = 1024;
const MAX_REDIRECTS: u32 = 10;

/// Timeouts and headers applied to every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    /// Hard cap on a whole request. Exceeding it is a retryable timeout.
    pub request_timeout: Duration,
    pub stall_timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(520),
            stall_timeout: Duration::from_secs(60),
            user_agent: concat!("imagenet-dl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Downloads archives with retry, reusing one connection-pooling handle.
pub struct Fetcher {
    easy: Easy,
    options: FetchOptions,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(options: FetchOptions, policy: RetryPolicy) -> Self {
        Self {
            easy: Easy::new(),
            options,
            policy,
        }
    }

    /// Fetches `url` into `dest`, retrying transient failures per the policy.
    ///
    /// Returns the number of bytes written and how many attempts it took.
    pub fn fetch(
        &mut self,
        url: &str,
        temp: &Path,
        dest: &Path,
        slot: WorkerSlot,
        sink: &dyn ProgressSink,
    ) -> Result<Attempted<u64>, RetryFailure> {
        let policy = self.policy;
        let result = run_with_retry(&policy, |attempt| {
            sink.on_event(ProgressEvent::AttemptStarted { slot, attempt });
            fetch_once(&mut self.easy, &self.options, url, temp, dest, slot, sink)
        });
        if result.is_err() {
            remove_if_exists(temp);
        }
        result
    }
}

fn fetch_once(
    easy: &mut Easy,
    options: &FetchOptions,
    url: &str,
    temp: &Path,
    dest: &Path,
    slot: WorkerSlot,
    sink: &dyn ProgressSink,
) -> Result<u64, FetchError> {
    let mut file = File::create(temp).map_err(FetchError::Storage)?;

    easy.url(url).map_err(FetchError::Curl)?;
    easy.get(true).map_err(FetchError::Curl)?;
    easy.follow_location(true).map_err(FetchError::Curl)?;
    easy.max_redirections(MAX_REDIRECTS).map_err(FetchError::Curl)?;
    // 4xx/5xx end the transfer before any body is written to the archive.
    easy.fail_on_error(true).map_err(FetchError::Curl)?;
    easy.connect_timeout(options.connect_timeout)
        .map_err(FetchError::Curl)?;
    easy.low_speed_limit(LOW_SPEED_LIMIT)
        .map_err(FetchError::Curl)?;
    easy.low_speed_time(options.stall_timeout)
        .map_err(FetchError::Curl)?;
    easy.timeout(options.request_timeout)
        .map_err(FetchError::Curl)?;
    easy.useragent(&options.user_agent).map_err(FetchError::Curl)?;
    let mut headers = List::new();
    headers
        .append("Accept: application/octet-stream")
        .map_err(FetchError::Curl)?;
    easy.http_headers(headers).map_err(FetchError::Curl)?;
    easy.progress(true).map_err(FetchError::Curl)?;

    let received = Cell::new(0u64);
    let last_reported = Cell::new(0u64);
    let mut write_error: Option<io::Error> = None;
    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| match file.write_all(data) {
                Ok(()) => {
                    received.set(received.get() + data.len() as u64);
                    Ok(data.len())
                }
                Err(e) => {
                    write_error = Some(e);
                    Ok(0)
                }
            })
            .map_err(FetchError::Curl)?;
        transfer
            .progress_function(|dltotal, dlnow, _, _| {
                let now = dlnow as u64;
                if now != last_reported.get() {
                    last_reported.set(now);
                    sink.on_event(ProgressEvent::Transferred {
                        slot,
                        bytes: now,
                        total: (dltotal > 0.0).then_some(dltotal as u64),
                    });
                }
                true
            })
            .map_err(FetchError::Curl)?;
        transfer.perform()
    };

    if let Err(e) = performed {
        if e.is_write_error() {
            if let Some(io_err) = write_error {
                return Err(FetchError::Storage(io_err));
            }
        }
        if e.is_http_returned_error() {
            let code = easy.response_code().map_err(FetchError::Curl)?;
            return Err(FetchError::Http(code));
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code().map_err(FetchError::Curl)?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }
    let received = received.get();
    let expected = easy.content_length_download().map_err(FetchError::Curl)?;
    if expected >= 0.0 && expected as u64 != received {
        return Err(FetchError::PartialTransfer {
            expected: expected as u64,
            received,
        });
    }

    file.sync_all().map_err(FetchError::Storage)?;
    drop(file);
    fs::rename(temp, dest).map_err(FetchError::Storage)?;
    Ok(received)
}

/// Removes `path`, ignoring a missing file and logging anything else.
pub(crate) fn remove_if_exists(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "could not remove file: {}", e),
    }
}
