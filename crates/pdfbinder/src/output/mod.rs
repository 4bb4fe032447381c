//! User-facing output for pdfbinder.
//!
//! This module handles:
//! - Formatted status messages
//! - The run progress bar
//! - Queue listings and run summaries
//!
//! # Examples
//!
//! ```no_run
//! use pdfbinder::output::{OutputFormatter, display_run_summary};
//! use pdfbinder::merge::RunOutcome;
//!
//! # fn example(outcome: &RunOutcome) {
//! let formatter = OutputFormatter::new(false, false);
//! display_run_summary(&formatter, outcome);
//! # }
//! ```

pub mod formatter;
pub mod progress;

pub use formatter::{MessageLevel, OutputFormatter};
pub use progress::ProgressBar;

use crate::merge::RunOutcome;
use crate::queue::FileQueue;
use crate::status::RunStatus;
use crate::utils::format_file_size;

/// List the queue in merge order.
pub fn display_queue(formatter: &OutputFormatter, queue: &FileQueue) {
    formatter.info(&format!(
        "{} file(s) queued, {}",
        queue.len(),
        format_file_size(queue.total_size())
    ));

    if formatter.is_verbose() {
        for file in queue.iter() {
            formatter.list_item(
                file.display_order + 1,
                &format!("{} ({}, {})", file.name, file.mime_type, format_file_size(file.size)),
            );
        }
    }
}

/// Bullet list of skipped files, or `None` if nothing was skipped.
pub fn skipped_files_report(skipped: &[String]) -> Option<String> {
    if skipped.is_empty() {
        return None;
    }
    let lines: Vec<String> = skipped.iter().map(|name| format!("  - {name}")).collect();
    Some(format!("Skipped files:\n{}", lines.join("\n")))
}

/// Report how a run ended.
pub fn display_run_summary(formatter: &OutputFormatter, outcome: &RunOutcome) {
    let state = &outcome.state;

    match state.status {
        RunStatus::Completed if state.skipped_files.is_empty() => formatter.success(&state.message),
        RunStatus::Completed => formatter.warning(&state.message),
        RunStatus::Cancelled => formatter.warning(&state.message),
        _ => formatter.error(&state.message),
    }

    if let Some(report) = skipped_files_report(&state.skipped_files) {
        formatter.warning(&report);
    }

    if let Some(receipt) = &outcome.receipt {
        formatter.info(&format!(
            "Saved {} ({} page(s), {})",
            receipt.path.display(),
            outcome.page_count,
            format_file_size(receipt.bytes)
        ));
        formatter.detail("Delivery", &format!("{:?}", receipt.method));
    }
}
