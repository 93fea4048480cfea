//! Fixed-size worker pool draining a shared task queue.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crate::aggregate::{failure_log_path, Aggregator, RunSummary};
use crate::class_id::ClassId;
use crate::config::RunOptions;
use crate::fetch::Fetcher;
use crate::outcome::Outcome;
use crate::progress::{ProgressEvent, ProgressSink, WorkerSlot};
use crate::task::DownloadTask;

use super::process::process_isolated;

type TaskQueue = Arc<Mutex<VecDeque<DownloadTask>>>;

/// Runs a list of classes through the pipeline with a bounded worker pool.
pub struct Dispatcher {
    options: RunOptions,
    sink: Arc<dyn ProgressSink>,
}

impl Dispatcher {
    pub fn new(options: RunOptions, sink: Arc<dyn ProgressSink>) -> Self {
        Self { options, sink }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Processes every identifier exactly once and returns the tallies.
    ///
    /// Per-class failures are part of the summary, not an `Err`; this only
    /// fails when the target directory cannot be created or no worker starts.
    pub fn run(&self, ids: Vec<ClassId>) -> Result<RunSummary> {
        let target = &self.options.target_dir;
        fs::create_dir_all(target)
            .with_context(|| format!("create target directory {}", target.display()))?;

        let count = ids.len();
        let queue: TaskQueue = Arc::new(Mutex::new(
            ids.into_iter()
                .map(|id| DownloadTask::plan(id, &self.options.url_template, target))
                .collect(),
        ));
        let aggregator = Arc::new(Aggregator::with_failure_log(failure_log_path(target)));
        let options = Arc::new(self.options.clone());

        let num_workers = self.options.workers.min(count);
        tracing::info!(classes = count, workers = num_workers, target = %target.display(), "starting run");

        let mut handles = Vec::with_capacity(num_workers);
        for index in 0..num_workers {
            let slot = WorkerSlot(index);
            let queue = Arc::clone(&queue);
            let aggregator = Arc::clone(&aggregator);
            let options = Arc::clone(&options);
            let sink = Arc::clone(&self.sink);
            let spawned = thread::Builder::new()
                .name(format!("worker-{}", slot))
                .spawn(move || worker_loop(slot, &queue, &options, &aggregator, sink.as_ref()));
            match spawned {
                Ok(h) => handles.push(h),
                // The queue is shared, so the workers already running will drain it.
                Err(e) if !handles.is_empty() => {
                    tracing::warn!("could not spawn worker {}: {}", slot, e);
                }
                Err(e) => return Err(e).context("spawn worker thread"),
            }
        }

        let mut lost_workers = 0usize;
        for h in handles {
            if h.join().is_err() {
                lost_workers += 1;
            }
        }
        let summary = aggregator.finalize();
        if summary.total() != count {
            anyhow::bail!(
                "{} of {} classes have no recorded outcome ({} worker(s) died)",
                count.saturating_sub(summary.total()),
                count,
                lost_workers
            );
        }
        tracing::info!(
            success = summary.success,
            skipped = summary.skipped,
            failed = summary.failed,
            "run finished"
        );
        Ok(summary)
    }
}

fn worker_loop(
    slot: WorkerSlot,
    queue: &Mutex<VecDeque<DownloadTask>>,
    options: &RunOptions,
    aggregator: &Aggregator,
    sink: &dyn ProgressSink,
) {
    let mut fetcher = Fetcher::new(options.fetch.clone(), options.retry);
    loop {
        let task = match queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
        {
            Some(t) => t,
            None => break,
        };
        let outcome = process_isolated(&task, &mut fetcher, options, slot, sink);
        match &outcome {
            Outcome::Failed(failure) => {
                tracing::warn!(wnid = %task.class_id, worker = %slot, "{}", failure);
            }
            other => {
                tracing::info!(wnid = %task.class_id, worker = %slot, outcome = ?other.kind(), "class done");
            }
        }
        let kind = outcome.kind();
        aggregator.record(&task.class_id, outcome);
        sink.on_event(ProgressEvent::Finished {
            slot,
            class_id: task.class_id,
            outcome: kind,
        });
    }
}
