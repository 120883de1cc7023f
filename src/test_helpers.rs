//! Shared test utilities for the infoscreen test suite.
//!
//! Provides fixture builders for feed directories, repositories, screens and
//! synthetic images.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let repo = test_repository(&tmp);
//! let feed = tmp.path().join("content");
//! write_file(&feed, "001-dawn.jpg", b"...");
//! ```

use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::config::ScreenConfig;
use crate::repository::Repository;

// =========================================================================
// Fixture setup
// =========================================================================

/// Write `bytes` to `dir/rel`, creating parent directories. Returns the path.
pub fn write_file(dir: &Path, rel: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Repository rooted at `<tmp>/rep`, kept apart from any feed directory.
pub fn test_repository(tmp: &TempDir) -> Repository {
    Repository::open(tmp.path().join("rep")).unwrap()
}

/// Screen config with every feed disabled.
pub fn screen_config(name: &str) -> ScreenConfig {
    ScreenConfig::named(name)
}

// =========================================================================
// Synthetic images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}
