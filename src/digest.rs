//! Keyed content digests.
//!
//! Every file that enters the repository is named after the HMAC-SHA-256 of
//! its bytes, keyed with a fixed application key. The digest depends only on
//! content: renaming a file or touching its modification time never changes
//! it. Output is unpadded URL-safe base64 so the digest can be used directly
//! as a file name and in URLs.
//!
//! The same key seeds the [`Accumulator`] the scanner folds directory stamps
//! into, which is why both live here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Application key for every keyed hash in this crate.
const DIGEST_KEY: &[u8] = b"infoscreen";

const READ_BUFFER_SIZE: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("IO error hashing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),
}

fn new_mac() -> HmacSha256 {
    <HmacSha256 as Mac>::new_from_slice(DIGEST_KEY).expect("HMAC-SHA-256 accepts keys of any size")
}

/// Keyed digest of a file's full contents.
///
/// Fails with [`DigestError::NotAFile`] for directories and
/// [`DigestError::Io`] when the file cannot be opened or read.
pub fn hash_file(path: &Path) -> Result<String, DigestError> {
    let io_err = |source| DigestError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    if file.metadata().map_err(io_err)?.is_dir() {
        return Err(DigestError::NotAFile(path.to_path_buf()));
    }

    let mut mac = new_mac();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_err(e)),
        };
        mac.update(&buf[..n]);
    }

    Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Streaming keyed hash threaded through a directory walk.
///
/// Stamps are folded in as they are produced; nothing is buffered.
pub struct Accumulator {
    mac: HmacSha256,
}

impl Accumulator {
    pub fn new() -> Self {
        Self { mac: new_mac() }
    }

    pub fn update(&mut self, stamp: &str) {
        self.mac.update(stamp.as_bytes());
    }

    /// Finish and return the digest as lowercase hex.
    pub fn finish(self) -> String {
        hex::encode(self.mac.finalize().into_bytes())
    }
}

impl Default for Accumulator {
    fn default() -> Self {
        Self::new()
    }
}
