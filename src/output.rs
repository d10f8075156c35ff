//! CLI output formatting.
//!
//! Progress and summaries are written for people: the file's path relative
//! to the input root is its identity, and anything that went wrong is shown
//! as an indented context line under it.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Files (3)
//! 001 cat.png
//! 002 dog.png
//!     Source: pack-2/dog.png
//! 003 broken.png
//! ```
//!
//! ## Run
//!
//! ```text
//! Processing 3 files (parallelism 2, 8 threads)
//! [1/3] written   cat.png
//! [2/3] skipped   broken.png
//!     Reason: Not a decodable image: Format error decoding Png: ...
//! [3/3] written   pack-2/dog.png
//!
//! Processed 3 files in 0.41s (7.3 files/s)
//!     written 2, skipped 1, rejected 0, failed 0, cancelled 0
//!     peak active 2
//! ```
//!
//! # Architecture
//!
//! Each view has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure:
//! no I/O, no side effects.

use crate::run::{ProcessEvent, RunStats};
use crate::scan::SourceFile;
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_relative(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// ============================================================================
// Check
// ============================================================================

/// Format the enumerated work set.
///
/// Files sitting directly in the input root show just their name; nested
/// files add a `Source:` line with the relative path.
pub fn format_scan_output(files: &[SourceFile]) -> Vec<String> {
    let mut lines = vec![format!("Files ({})", files.len())];
    for (i, file) in files.iter().enumerate() {
        lines.push(format!("{} {}", format_index(i + 1), file.file_name));
        let relative = display_relative(&file.relative);
        if relative != file.file_name {
            lines.push(format!("{}Source: {}", indent(1), relative));
        }
    }
    lines
}

pub fn print_scan_output(files: &[SourceFile]) {
    for line in format_scan_output(files) {
        println!("{}", line);
    }
}

// ============================================================================
// Run
// ============================================================================

/// Format one progress event.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            total,
            parallelism,
            threads,
        } => vec![format!(
            "Processing {} files (parallelism {}, {} threads)",
            total, parallelism, threads
        )],
        ProcessEvent::FileFinished {
            position,
            total,
            relative,
            outcome,
        } => {
            let mut lines = vec![format!(
                "[{}/{}] {:<9} {}",
                position,
                total,
                outcome.label(),
                display_relative(relative)
            )];
            if let Some(reason) = outcome.reason() {
                lines.push(format!("{}Reason: {}", indent(1), reason));
            }
            lines
        }
    }
}

/// Format the end-of-run summary.
pub fn format_summary(stats: &RunStats) -> Vec<String> {
    let rate = match stats.throughput() {
        Some(rate) => format!("{:.1} files/s", rate),
        None => "n/a".to_string(),
    };
    vec![
        format!(
            "Processed {} files in {:.2}s ({})",
            stats.discovered,
            stats.elapsed.as_secs_f64(),
            rate
        ),
        format!(
            "{}written {}, skipped {}, rejected {}, failed {}, cancelled {}",
            indent(1),
            stats.written,
            stats.skipped,
            stats.rejected,
            stats.failed,
            stats.cancelled
        ),
        format!("{}peak active {}", indent(1), stats.peak_active),
    ]
}

pub fn print_summary(stats: &RunStats) {
    for line in format_summary(stats) {
        println!("{}", line);
    }
}
