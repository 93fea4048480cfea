//! CLI for the imagenet-dl class archive downloader.

mod commands;
mod progress;

use anyhow::{Context, Result};
use clap::Parser;
use imagenet_dl_core::config::{self, DlConfig};
use std::path::PathBuf;

use commands::{run_download, run_status};

/// Top-level CLI: download and extract one tar archive per class listed in a CSV.
#[derive(Debug, Parser)]
#[command(name = "imagenet-dl")]
#[command(
    about = "Multi-threaded downloader for per-class ImageNet archives",
    long_about = None
)]
pub struct Cli {
    /// CSV file containing class ids (must have a "wnid" column).
    #[arg(long, visible_alias = "fname", default_value = "data.csv", value_name = "PATH")]
    pub csv: PathBuf,

    /// Number of parallel download workers [config default: 10].
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Target directory for archives and extracted classes (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub target: Option<PathBuf>,

    /// Delete each archive after it has been extracted.
    #[arg(long, visible_alias = "delete-tar", conflicts_with = "keep_archives")]
    pub delete_archives: bool,

    /// Keep archives next to the extracted class directories.
    #[arg(long)]
    pub keep_archives: bool,

    /// Base URL, or a URL template containing {wnid}.
    #[arg(long, value_name = "BASE_OR_TEMPLATE")]
    pub url: Option<String>,

    /// Maximum attempts per archive, including the first.
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// Per-request timeout in seconds.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Resize extracted images to PX x PX JPEG.
    #[arg(long, value_name = "PX")]
    pub resize: Option<u32>,

    /// Read settings from this file instead of the default config location.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Report completed / pending / failed classes and exit without downloading.
    #[arg(long)]
    pub status: bool,
}

impl Cli {
    fn load_config(&self) -> Result<DlConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_from(path)?,
            None => config::load_or_init()?,
        };
        Ok(cfg)
    }

    /// Command-line flags take precedence over the config file.
    fn apply_overrides(&self, cfg: &mut DlConfig) {
        if let Some(workers) = self.workers {
            cfg.workers = workers;
        }
        if let Some(url) = &self.url {
            cfg.base_url = url.clone();
        }
        if self.delete_archives {
            cfg.delete_archives = true;
        }
        if self.keep_archives {
            cfg.delete_archives = false;
        }
        if let Some(retries) = self.retries {
            cfg.retry.get_or_insert_with(Default::default).max_attempts = retries;
        }
        if let Some(timeout) = self.timeout {
            cfg.request_timeout_secs = timeout;
        }
        if self.resize.is_some() {
            cfg.resize = self.resize;
        }
    }

    fn target_dir(&self) -> Result<PathBuf> {
        match &self.target {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("cannot determine current directory"),
        }
    }
}

pub fn run_from_args() -> Result<()> {
    run(Cli::parse())
}

pub fn run(cli: Cli) -> Result<()> {
    if cli.status {
        let target = cli.target_dir()?;
        return run_status(&cli.csv, &target);
    }
    let mut cfg = cli.load_config()?;
    cli.apply_overrides(&mut cfg);
    run_download(&cli.csv, &cfg, cli.target_dir()?)
}

#[cfg(test)]
mod tests;
