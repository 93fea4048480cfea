//! One class through the pipeline, with failures and panics isolated.

use std::any::Any;
use std::fs;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use crate::config::RunOptions;
use crate::extract::{extract_archive, ExtractOptions};
use crate::fetch::{remove_if_exists, Fetcher};
use crate::outcome::{ClassError, Failure, FailureKind, Outcome};
use crate::progress::{ProgressEvent, ProgressSink, WorkerSlot};
use crate::skip::is_already_extracted;
use crate::task::DownloadTask;

/// Runs `task` and always returns exactly one outcome.
///
/// A panic anywhere in the pipeline is caught here and reported as an
/// `InternalError`; the fetcher is rebuilt since its handle may be mid-transfer.
pub(super) fn process_isolated(
    task: &DownloadTask,
    fetcher: &mut Fetcher,
    options: &RunOptions,
    slot: WorkerSlot,
    sink: &dyn ProgressSink,
) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        process_task(task, fetcher, options, slot, sink)
    }));
    match result {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => Outcome::Failed(Failure::from(e)),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(wnid = %task.class_id, "worker panicked: {}", message);
            *fetcher = Fetcher::new(options.fetch.clone(), options.retry);
            remove_if_exists(&task.temp_path());
            Outcome::Failed(Failure {
                kind: FailureKind::Internal,
                message: format!("panic: {}", message),
            })
        }
    }
}

fn process_task(
    task: &DownloadTask,
    fetcher: &mut Fetcher,
    options: &RunOptions,
    slot: WorkerSlot,
    sink: &dyn ProgressSink,
) -> Result<Outcome, ClassError> {
    if is_already_extracted(&options.target_dir, &task.class_id) {
        tracing::debug!(wnid = %task.class_id, "already extracted, skipping");
        return Ok(Outcome::Skipped);
    }

    sink.on_event(ProgressEvent::FetchStarted {
        slot,
        class_id: task.class_id.clone(),
    });
    let fetched = fetcher.fetch(
        &task.url,
        &task.temp_path(),
        &task.archive_path,
        slot,
        sink,
    )?;
    tracing::debug!(
        wnid = %task.class_id,
        bytes = fetched.value,
        attempts = fetched.attempts,
        "archive downloaded"
    );

    sink.on_event(ProgressEvent::Extracting {
        slot,
        class_id: task.class_id.clone(),
    });
    if let Err(source) = fs::create_dir_all(&task.class_dir) {
        remove_if_exists(&task.archive_path);
        return Err(ClassError::Filesystem {
            context: format!("create {}", task.class_dir.display()),
            source,
        });
    }
    let extract_opts = ExtractOptions {
        resize: options.resize,
    };
    if let Err(e) = extract_archive(&task.archive_path, &task.class_dir, &extract_opts) {
        // A half-populated directory would be mistaken for a finished class next run.
        remove_class_dir(task);
        remove_if_exists(&task.archive_path);
        return Err(e.into());
    }

    if options.delete_archives {
        remove_if_exists(&task.archive_path);
    }
    Ok(Outcome::Success)
}

fn remove_class_dir(task: &DownloadTask) {
    match fs::remove_dir_all(&task.class_dir) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            dir = %task.class_dir.display(),
            "could not remove partially extracted directory: {}",
            e
        ),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
