//! Terminal progress: one bar per worker slot plus an overall counter.

use imagenet_dl_core::outcome::OutcomeKind;
use imagenet_dl_core::progress::{ProgressEvent, ProgressSink, WorkerSlot};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

#[derive(Default)]
struct Tally {
    success: usize,
    skipped: usize,
    failed: usize,
}

/// Renders [`ProgressEvent`]s with indicatif. Rendering state only; outcomes are
/// decided and counted by the core.
pub struct MultiBarReporter {
    multi: MultiProgress,
    overall: ProgressBar,
    bars: Mutex<HashMap<WorkerSlot, ProgressBar>>,
    tally: Mutex<Tally>,
}

impl MultiBarReporter {
    pub fn new(total: usize) -> Self {
        let multi = MultiProgress::new();
        let overall = multi.add(ProgressBar::new(total as u64));
        overall.set_style(
            ProgressStyle::with_template(
                "{prefix:>24} [{elapsed_precise}] [{bar:40.green/white}] {pos}/{len} ({percent}%) {msg}",
            )
            .expect("progress template is valid")
            .progress_chars("=>-"),
        );
        overall.set_prefix("Total");
        Self {
            multi,
            overall,
            bars: Mutex::new(HashMap::new()),
            tally: Mutex::new(Tally::default()),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{prefix:>24} [{bar:40.cyan/blue}] {bytes}/{total_bytes} @ {bytes_per_sec} ETA {eta} {msg}",
        )
        .expect("progress template is valid")
        .progress_chars("=>-")
    }

    /// Bar for `slot`, created on first use.
    fn bar(&self, slot: WorkerSlot) -> ProgressBar {
        let mut bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        bars.entry(slot)
            .or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(0));
                bar.set_style(Self::bar_style());
                bar
            })
            .clone()
    }

    fn count(&self, outcome: OutcomeKind) {
        let mut tally = self.tally.lock().unwrap_or_else(PoisonError::into_inner);
        match outcome {
            OutcomeKind::Success => tally.success += 1,
            OutcomeKind::Skipped => tally.skipped += 1,
            OutcomeKind::Failed => tally.failed += 1,
        }
        self.overall.set_message(format!(
            "ok {} / skipped {} / failed {}",
            tally.success, tally.skipped, tally.failed
        ));
        self.overall.inc(1);
    }

    /// Clears worker bars and leaves the overall bar in its final state.
    pub fn finish(&self) {
        let bars = self.bars.lock().unwrap_or_else(PoisonError::into_inner);
        for bar in bars.values() {
            bar.finish_and_clear();
        }
        self.overall.finish();
    }
}

impl ProgressSink for MultiBarReporter {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::FetchStarted { slot, class_id } => {
                let bar = self.bar(slot);
                bar.reset();
                bar.set_length(0);
                bar.set_prefix(format!("[{}] {}", slot, class_id));
                bar.set_message("downloading");
            }
            ProgressEvent::AttemptStarted { slot, attempt } => {
                let bar = self.bar(slot);
                bar.set_position(0);
                if attempt > 1 {
                    bar.set_message(format!("retry {}", attempt));
                }
            }
            ProgressEvent::Transferred { slot, bytes, total } => {
                let bar = self.bar(slot);
                if let Some(total) = total {
                    bar.set_length(total);
                }
                bar.set_position(bytes);
            }
            ProgressEvent::Extracting { slot, .. } => {
                self.bar(slot).set_message("extracting");
            }
            ProgressEvent::Finished { slot, outcome, .. } => {
                if outcome != OutcomeKind::Skipped {
                    self.bar(slot).set_message(match outcome {
                        OutcomeKind::Failed => "failed",
                        _ => "done",
                    });
                }
                self.count(outcome);
            }
        }
    }
}
