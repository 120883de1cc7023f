//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides the output size) and the [`backend`](super::backend) (which
//! does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing operation logic.

use std::path::PathBuf;

/// Parameters for resizing a source image to exact pixel dimensions.
///
/// The result is returned as encoded bytes; nothing is written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeParams {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
}
