//! Content feeds and their poll cycle.
//!
//! A feed ([`ContentSource`]) ties one path to one [`SourceKind`]. Every poll
//! cycle runs in two phases so that slow disk work never happens while the
//! registry lock is held:
//!
//! ```text
//! check()  (no lock)     scan / hash  ──► digest equal? ──► Unchanged
//!                                          │ no
//!                                          ▼
//!                        ingest or parse ──► Update::Replace
//!
//! apply()  (under lock)  swap entries + digest, serial += 1
//! ```
//!
//! | Kind | Path | Change detection | Entries |
//! |------|------|------------------|---------|
//! | `Info`, `DiaShow` | directory | [`scan`] digest | one image/video per ingested file |
//! | `Ticker` | directory | [`scan`] digest | one text entry per paragraph, inline |
//! | `TickerDefault` | single file | content digest | always exactly one text entry |
//!
//! An empty path means the feed is not configured; it resets to its empty
//! state. Scan and hash failures leave the feed untouched until a later cycle
//! succeeds, and a file that fails to ingest is left out of the new list.

use crate::digest::{self, DigestError};
use crate::media;
use crate::repository::Repository;
use crate::scan::{self, ScanError};
use crate::ticker;
use crate::types::ContentEntry;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Digest(#[from] DigestError),
}

/// The fixed set of feed classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Main content images and videos.
    Info,
    /// Mixin images shown between content.
    DiaShow,
    /// Directory of ticker text files.
    Ticker,
    /// Single fallback ticker file.
    TickerDefault,
}

impl SourceKind {
    /// Whether a scanned file belongs to a feed of this kind.
    pub fn selects(self, path: &Path) -> bool {
        match self {
            SourceKind::Info | SourceKind::DiaShow => media::is_image_or_video(path),
            SourceKind::Ticker => media::is_text(path),
            SourceKind::TickerDefault => true,
        }
    }

    /// Entries of a feed that has nothing to show yet.
    pub fn empty_entries(self) -> Vec<ContentEntry> {
        match self {
            SourceKind::TickerDefault => vec![ContentEntry::text("")],
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceKind::Info => "info",
            SourceKind::DiaShow => "dia-show",
            SourceKind::Ticker => "ticker",
            SourceKind::TickerDefault => "ticker-default",
        };
        f.write_str(name)
    }
}

/// Identity of a feed. Screens naming the same path and kind share one feed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceKey {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceKey {
    pub fn new(path: impl Into<PathBuf>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.path.as_os_str().is_empty()
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_configured() {
            write!(f, "{} {}", self.kind, self.path.display())
        } else {
            write!(f, "{} (not configured)", self.kind)
        }
    }
}

/// Result of the lock-free half of a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Update {
    /// Digest matches what the feed last committed.
    Unchanged,
    /// Feed is not configured.
    Reset,
    /// New content, to be committed together with its digest.
    Replace {
        digest: String,
        entries: Vec<ContentEntry>,
    },
}

/// What a committed poll did to a feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Updated { entries: usize },
    Reset,
}

/// One feed's committed state.
#[derive(Debug, Clone)]
pub struct ContentSource {
    key: SourceKey,
    last_digest: String,
    entries: Arc<[ContentEntry]>,
    serial: u64,
}

impl ContentSource {
    pub fn new(key: SourceKey) -> Self {
        let entries = key.kind.empty_entries().into();
        Self {
            key,
            last_digest: String::new(),
            entries,
            serial: 0,
        }
    }

    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    pub fn last_digest(&self) -> &str {
        &self.last_digest
    }

    /// Shared handle on the current entry list; replaced, never mutated.
    pub fn entries(&self) -> Arc<[ContentEntry]> {
        Arc::clone(&self.entries)
    }

    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// Commit an [`Update`]. Bumps the serial by one iff the content changed.
    pub fn apply(&mut self, update: Update) -> PollOutcome {
        match update {
            Update::Unchanged => PollOutcome::Unchanged,
            Update::Reset => {
                let empty = self.key.kind.empty_entries();
                if self.last_digest.is_empty() && *self.entries == *empty {
                    return PollOutcome::Unchanged;
                }
                self.last_digest.clear();
                self.entries = empty.into();
                self.serial += 1;
                PollOutcome::Reset
            }
            Update::Replace { digest, entries } => {
                // A concurrent cycle may already have committed this digest.
                if digest == self.last_digest {
                    return PollOutcome::Unchanged;
                }
                let count = entries.len();
                self.last_digest = digest;
                self.entries = entries.into();
                self.serial += 1;
                PollOutcome::Updated { entries: count }
            }
        }
    }
}

/// Decide whether a feed changed since `last_digest` and, if so, build its
/// new entries. Runs without any lock held.
pub fn check(
    key: &SourceKey,
    last_digest: &str,
    repository: &Repository,
) -> Result<Update, SourceError> {
    if !key.is_configured() {
        return Ok(Update::Reset);
    }

    if key.kind == SourceKind::TickerDefault {
        let digest = digest::hash_file(&key.path)?;
        if digest == last_digest {
            return Ok(Update::Unchanged);
        }
        let text = ticker::parse_ticker_file(&key.path)
            .into_iter()
            .next()
            .unwrap_or_default();
        info!(feed = %key, %text, "new default ticker");
        return Ok(Update::Replace {
            digest,
            entries: vec![ContentEntry::text(text)],
        });
    }

    let scanned = scan::scan(&key.path, |p| key.kind.selects(p))?;
    if scanned.digest == last_digest {
        return Ok(Update::Unchanged);
    }

    let entries = import(key.kind, &scanned.files, repository);
    info!(feed = %key, entries = entries.len(), "new content list");
    Ok(Update::Replace {
        digest: scanned.digest,
        entries,
    })
}

/// Current digest and matching file count of a feed, without ingesting.
///
/// `None` for a feed that is not configured.
pub fn fingerprint(key: &SourceKey) -> Result<Option<(String, usize)>, SourceError> {
    if !key.is_configured() {
        return Ok(None);
    }
    if key.kind == SourceKind::TickerDefault {
        return Ok(Some((digest::hash_file(&key.path)?, 1)));
    }
    let scanned = scan::scan(&key.path, |p| key.kind.selects(p))?;
    Ok(Some((scanned.digest, scanned.files.len())))
}

/// Build entries for scanned files, preserving scan order.
fn import(kind: SourceKind, files: &[PathBuf], repository: &Repository) -> Vec<ContentEntry> {
    if kind == SourceKind::Ticker {
        let paragraphs: Vec<Vec<String>> = files
            .par_iter()
            .map(|f| ticker::parse_ticker_file(f))
            .collect();
        return paragraphs
            .into_iter()
            .flatten()
            .map(ContentEntry::text)
            .collect();
    }

    let ingested: Vec<Option<ContentEntry>> = files
        .par_iter()
        .map(|f| match repository.ingest(f) {
            Ok(name) => {
                info!("  {name}");
                Some(if media::is_video(Path::new(&name)) {
                    ContentEntry::video(name)
                } else {
                    ContentEntry::image(name)
                })
            }
            Err(e) => {
                error!(file = %f.display(), error = %e, "skipping file");
                None
            }
        })
        .collect();
    ingested.into_iter().flatten().collect()
}
