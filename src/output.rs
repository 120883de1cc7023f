//! CLI output formatting for poll cycles and feed state.
//!
//! # Feed Display Contract
//!
//! Every feed follows the same two-level pattern across commands:
//!
//! 1. **Header line**: positional index + feed kind + path
//! 2. **Context lines**: indented outcome, serial, digest, etc.
//!
//! # Output Format
//!
//! ## Sync / watch
//!
//! ```text
//! Cycle 1 (12 ms): 2 changed, 1 failed
//! 001 info /srv/content
//!     updated (3 entries)
//! 002 ticker /srv/ticker
//!     unchanged
//! 003 dia-show /srv/mixin
//!     failed: Cannot read feed directory /srv/mixin: No such file or directory (os error 2)
//! ```
//!
//! ## Check
//!
//! ```text
//! 001 info /srv/content
//!     2 files, digest 6f1ac3d2e09b
//! 002 ticker (not configured)
//! ```
//!
//! # Architecture
//!
//! Each report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::poller::CycleReport;
use crate::registry::FeedStatus;
use crate::source::{PollOutcome, SourceError, SourceKey};

/// Poll results of one cycle, in feed order.
pub type PollResults = [(SourceKey, Result<PollOutcome, SourceError>)];

/// Fingerprint results of `check`, in feed order.
pub type FingerprintResults = [(SourceKey, Result<Option<(String, usize)>, SourceError>)];

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// First 12 characters of a digest; enough to tell feeds apart by eye.
fn short_digest(digest: &str) -> &str {
    digest.get(..12).unwrap_or(digest)
}

fn feed_header(index: usize, key: &SourceKey) -> String {
    format!("{} {}", format_index(index), key)
}

fn outcome_line(result: &Result<PollOutcome, SourceError>) -> String {
    match result {
        Ok(PollOutcome::Unchanged) => "unchanged".to_string(),
        Ok(PollOutcome::Updated { entries: 1 }) => "updated (1 entry)".to_string(),
        Ok(PollOutcome::Updated { entries }) => format!("updated ({} entries)", entries),
        Ok(PollOutcome::Reset) => "reset".to_string(),
        Err(e) => format!("failed: {}", e),
    }
}

pub fn format_poll_results(results: &PollResults) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (key, result)) in results.iter().enumerate() {
        lines.push(feed_header(i + 1, key));
        lines.push(format!("{}{}", indent(1), outcome_line(result)));
    }
    lines
}

pub fn format_cycle_report(report: &CycleReport) -> Vec<String> {
    let mut header = format!(
        "Cycle {} ({} ms): {} changed",
        report.cycle,
        report.elapsed.as_millis(),
        report.changed()
    );
    if report.failed() > 0 {
        header.push_str(&format!(", {} failed", report.failed()));
    }
    let mut lines = vec![header];
    lines.extend(format_poll_results(&report.results));
    lines
}

pub fn print_cycle_report(report: &CycleReport) {
    for line in format_cycle_report(report) {
        println!("{}", line);
    }
}

pub fn format_statuses(statuses: &[FeedStatus]) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, status) in statuses.iter().enumerate() {
        lines.push(feed_header(i + 1, &status.key));
        let digest = if status.digest.is_empty() {
            "-"
        } else {
            short_digest(&status.digest)
        };
        lines.push(format!(
            "{}serial {}, {} entries, digest {}",
            indent(1),
            status.serial,
            status.entries,
            digest
        ));
    }
    lines
}

pub fn print_statuses(statuses: &[FeedStatus]) {
    for line in format_statuses(statuses) {
        println!("{}", line);
    }
}

pub fn format_fingerprints(results: &FingerprintResults) -> Vec<String> {
    let mut lines = Vec::new();
    for (i, (key, result)) in results.iter().enumerate() {
        lines.push(feed_header(i + 1, key));
        match result {
            Ok(None) => {}
            Ok(Some((digest, 1))) => {
                lines.push(format!("{}1 file, digest {}", indent(1), short_digest(digest)))
            }
            Ok(Some((digest, files))) => lines.push(format!(
                "{}{} files, digest {}",
                indent(1),
                files,
                short_digest(digest)
            )),
            Err(e) => lines.push(format!("{}unreadable: {}", indent(1), e)),
        }
    }
    lines
}

pub fn print_fingerprints(results: &FingerprintResults) {
    for line in format_fingerprints(results) {
        println!("{}", line);
    }
}
