//! Directory scanning and change detection.
//!
//! [`scan`] walks a feed directory depth-first, visiting the entries of every
//! directory in file-name order, and returns both the matching files and an
//! aggregate digest of the listing.
//!
//! ## Aggregate digest
//!
//! Each matching file contributes a stamp
//!
//! ```text
//! <file name>-<mtime, RFC 3339, second precision, UTC>-<size in bytes>
//! ```
//!
//! folded into one keyed hash ([`digest::Accumulator`]). File contents are
//! never read, so a poll on an unchanged feed costs one directory walk and a
//! single string comparison, yet additions, removals, renames, and size or
//! mtime changes all produce a new digest. Ordering is fixed by sorting, so the
//! digest is reproducible across runs.
//!
//! ## Failure policy
//!
//! An unreadable root is an error: the caller keeps its previous state. An
//! unreadable subdirectory (or an entry whose metadata cannot be read) is
//! logged and skipped, so one bad folder yields a partial feed instead of a
//! stalled one.

use crate::digest::Accumulator;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot read feed directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Matching files in walk order plus the aggregate digest of their stamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    pub digest: String,
}

pub fn scan(root: &Path, classify: impl Fn(&Path) -> bool) -> Result<ScanResult, ScanError> {
    fs::read_dir(root).map_err(|source| ScanError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    let mut acc = Accumulator::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!(path = ?e.path(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }

        debug!(file = %entry.path().display(), "checking file");
        if !classify(entry.path()) {
            continue;
        }

        let meta = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                error!(path = %entry.path().display(), error = %e, "cannot stat file");
                continue;
            }
        };

        acc.update(&stamp(
            &entry.file_name().to_string_lossy(),
            meta.modified().ok().map(DateTime::<Utc>::from),
            meta.len(),
        ));
        files.push(entry.into_path());
    }

    let digest = acc.finish();
    debug!(root = %root.display(), %digest, files = files.len(), "scanned feed");
    Ok(ScanResult { files, digest })
}

fn stamp(name: &str, modified: Option<DateTime<Utc>>, size: u64) -> String {
    let mtime = modified
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_default();
    format!("{name}-{mtime}-{size}")
}
