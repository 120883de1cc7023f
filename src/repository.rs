//! Content-addressed repository of original media files.
//!
//! Source files are copied into a flat store directory under the name
//! `<digest><extension>`, where the digest comes from [`crate::digest`]. Two
//! files with the same bytes always land on the same name, so re-importing a
//! feed after a rename or a touch is a no-op on disk.
//!
//! ## Layout
//!
//! ```text
//! rep/
//! ├── 3q2-7wEl0yXxV2Ivp6d1DkzZ3yRa5M0cbbM6d8fbT2s.jpg
//! ├── Qh3v0A9UbqfM1bN4cO6E5wH1ZkqDfTf0pG0h3Zq4r0c.mp4
//! └── …
//! ```
//!
//! There is no index: the file on disk is the only state. Presence of the
//! target is checked before copying, and new files are first written to a
//! temporary sibling and then renamed into place, so a failed copy never
//! leaves a partial file under a final name. Concurrent ingests of the same
//! content need no lock; both publish identical bytes.
//!
//! Files are never modified or deleted here.

use crate::digest::{self, DigestError};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error(transparent)]
    Digest(#[from] DigestError),
    #[error("Repository target is a directory: {0}")]
    TargetIsDirectory(PathBuf),
    #[error("Failed to copy {source_path} into repository: {error}")]
    Copy {
        source_path: PathBuf,
        #[source]
        error: io::Error,
    },
}

/// Handle on the repository root directory.
#[derive(Debug, Clone)]
pub struct Repository {
    root: PathBuf,
}

impl Repository {
    /// Open the repository, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a repository entry.
    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Ensure a content-named copy of `source` exists and return its name.
    pub fn ingest(&self, source: &Path) -> Result<String, RepositoryError> {
        let digest = digest::hash_file(source)?;
        let name = repository_name(&digest, source);
        let target = self.root.join(&name);

        match fs::metadata(&target) {
            Ok(meta) if meta.is_dir() => {
                return Err(RepositoryError::TargetIsDirectory(target));
            }
            Ok(_) => {
                debug!(source = %source.display(), %name, "already in repository");
                return Ok(name);
            }
            Err(_) => {}
        }

        info!(source = %source.display(), target = %target.display(), "copying to repository");
        self.publish(source, &target)?;
        Ok(name)
    }

    fn publish(&self, source: &Path, target: &Path) -> Result<(), RepositoryError> {
        let copy_err = |error| RepositoryError::Copy {
            source_path: source.to_path_buf(),
            error,
        };

        let mut input = File::open(source).map_err(copy_err)?;
        // Dropped (and deleted) on any error before `persist`.
        let mut temp = tempfile::Builder::new()
            .prefix(".ingest-")
            .tempfile_in(&self.root)
            .map_err(copy_err)?;
        io::copy(&mut input, temp.as_file_mut()).map_err(copy_err)?;
        temp.as_file().sync_all().map_err(copy_err)?;
        temp.persist(target).map_err(|e| copy_err(e.error))?;
        Ok(())
    }
}

/// `<digest><original extension>`, extension kept verbatim with its dot.
fn repository_name(digest: &str, source: &Path) -> String {
    match source.extension() {
        Some(ext) => format!("{}.{}", digest, ext.to_string_lossy()),
        None => digest.to_string(),
    }
}
