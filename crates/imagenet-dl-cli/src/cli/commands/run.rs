//! Default command: download and extract every class in the CSV.

use anyhow::{Context, Result};
use imagenet_dl_core::aggregate::{failure_log_path, RunSummary};
use imagenet_dl_core::catalog::load_class_ids;
use imagenet_dl_core::config::{DlConfig, RunOptions};
use imagenet_dl_core::logging;
use imagenet_dl_core::scheduler::Dispatcher;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cli::progress::MultiBarReporter;

const RULE_WIDTH: usize = 80;

/// Validates everything up front, then runs the dispatcher.
///
/// Setup errors (bad config, missing CSV or `wnid` column) are returned
/// before the target directory is touched.
pub fn run_download(csv: &Path, cfg: &DlConfig, target: PathBuf) -> Result<()> {
    let options = RunOptions::from_config(cfg, target.clone())?;
    let ids = load_class_ids(csv)?;

    fs::create_dir_all(&target)
        .with_context(|| format!("create target directory {}", target.display()))?;
    if let Err(e) = logging::init_logging(&target) {
        logging::init_logging_stderr();
        tracing::warn!("file logging unavailable, using stderr: {:#}", e);
    }
    tracing::info!(classes = ids.len(), csv = %csv.display(), "loaded class ids");
    tracing::debug!("resolved options: {:?}", options);

    print_banner(ids.len(), &options);

    let reporter = Arc::new(MultiBarReporter::new(ids.len()));
    let summary = Dispatcher::new(options, reporter.clone()).run(ids);
    reporter.finish();
    let summary = summary?;

    print_summary(&summary, &target);
    Ok(())
}

fn print_banner(classes: usize, options: &RunOptions) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}");
    println!("ImageNet Downloader Started");
    println!("Classes to download: {}", classes);
    println!("Parallel workers: {}", options.workers);
    println!("Target directory: {}", options.target_dir.display());
    println!("Delete archives: {}", options.delete_archives);
    println!("{rule}\n");
}

fn print_summary(summary: &RunSummary, target: &Path) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}");
    println!("Download Completed!");
    println!("Success: {}", summary.success);
    println!("Skipped: {}", summary.skipped);
    println!("Failed:  {}", summary.failed);
    println!("Total:   {}", summary.total());
    if summary.failed > 0 {
        println!("Failures logged to {}", failure_log_path(target).display());
    }
    println!("{rule}\n");
}
