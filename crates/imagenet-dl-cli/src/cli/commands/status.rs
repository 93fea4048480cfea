//! `imagenet-dl --status` – report resume progress without downloading.

use anyhow::{Context, Result};
use imagenet_dl_core::aggregate::FAILURE_LOG_NAME;
use imagenet_dl_core::catalog::load_class_ids;
use imagenet_dl_core::class_id::ClassId;
use imagenet_dl_core::status::{self, StatusReport};
use std::path::Path;

const MAX_PENDING_LISTED: usize = 20;
const MAX_FAILED_LISTED: usize = 10;

pub fn run_status(csv: &Path, target: &Path) -> Result<()> {
    let ids = load_class_ids(csv)?;
    let report = status::scan(&ids, target)
        .with_context(|| format!("read {}", target.join(FAILURE_LOG_NAME).display()))?;
    print!("{}", render(&report));
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let rule = "=".repeat(80);
    let mut out = String::new();
    out.push_str(&format!("\n{rule}\nResume Status Report\n{rule}\n"));
    out.push_str(&format!("Total classes in CSV: {}\n", report.total()));
    out.push_str(&format!("Completed:            {}\n", report.completed.len()));
    out.push_str(&format!("Pending:              {}\n", report.pending.len()));
    out.push_str(&format!("Failed:               {}\n", report.failed.len()));
    out.push_str(&format!("{rule}\n"));
    list(&mut out, "Pending downloads:", &report.pending, MAX_PENDING_LISTED);
    list(
        &mut out,
        &format!("Failed downloads (check {FAILURE_LOG_NAME} for details):"),
        &report.failed,
        MAX_FAILED_LISTED,
    );
    out.push_str(&format!("\n{rule}\n\n"));
    out.push_str(&format!("Progress: {:.1}% complete\n", report.completion_pct()));
    out
}

fn list(out: &mut String, title: &str, ids: &[ClassId], limit: usize) {
    if ids.is_empty() {
        return;
    }
    out.push_str(&format!("\n{title}\n"));
    for id in ids.iter().take(limit) {
        out.push_str(&format!("  - {id}\n"));
    }
    if ids.len() > limit {
        out.push_str(&format!("  ... and {} more\n", ids.len() - limit));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: usize, prefix: &str) -> Vec<ClassId> {
        (0..n)
            .map(|i| ClassId::parse(&format!("{prefix}{i}")).unwrap())
            .collect()
    }

    #[test]
    fn render_truncates_long_lists() {
        let report = StatusReport {
            completed: ids(2, "c"),
            pending: ids(25, "p"),
            failed: ids(1, "p"),
        };
        let text = render(&report);
        assert!(text.contains("Total classes in CSV: 27"));
        assert!(text.contains("  - p19\n"));
        assert!(!text.contains("  - p20\n"));
        assert!(text.contains("  ... and 5 more"));
        assert!(text.contains("Progress: 7.4% complete"));
    }

    #[test]
    fn render_omits_empty_sections() {
        let report = StatusReport {
            completed: ids(3, "c"),
            ..StatusReport::default()
        };
        let text = render(&report);
        assert!(!text.contains("Pending downloads:"));
        assert!(!text.contains("Failed downloads"));
        assert!(text.contains("Progress: 100.0% complete"));
    }
}
