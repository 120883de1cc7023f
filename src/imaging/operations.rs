//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take the requested display box, compute parameters, and call the backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::ResizeParams;
use std::path::Path;
use tracing::debug;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Get image dimensions using the backend.
pub fn get_dimensions(backend: &impl ImageBackend, path: &Path) -> Result<(u32, u32)> {
    let dims = backend.identify(path)?;
    Ok((dims.width, dims.height))
}

/// A rendered derivative: its encoded bytes and final size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FittedImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Scale `source` to fit a `width` x `height` box and encode it.
///
/// See [`calculate_fit_dimensions`] for the sizing rule.
pub fn create_fitted_image(
    backend: &impl ImageBackend,
    source: &Path,
    width: u32,
    height: u32,
) -> Result<FittedImage> {
    let original = get_dimensions(backend, source)?;
    let (w, h) = calculate_fit_dimensions(original, (width, height));
    debug!(
        source = %source.display(),
        from = ?original,
        to = ?(w, h),
        "resizing image"
    );

    let bytes = backend.resize(&ResizeParams {
        source: source.to_path_buf(),
        width: w,
        height: h,
    })?;

    Ok(FittedImage {
        width: w,
        height: h,
        bytes,
    })
}
