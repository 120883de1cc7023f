//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Calculate the size of a source image scaled to fit a display box.
///
/// The image is scaled to the box width; if the scaled height would exceed
/// the box height it is scaled to the box height instead. The aspect ratio is
/// always preserved and neither result dimension is ever zero.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `bounds` - Requested display box (width, height)
///
/// # Examples
/// ```
/// # use infoscreen::imaging::calculate_fit_dimensions;
/// // Landscape into a landscape box: width wins
/// assert_eq!(calculate_fit_dimensions((4000, 3000), (1920, 1080)), (1440, 1080));
///
/// // Wide panorama: width matches, height is smaller than the box
/// assert_eq!(calculate_fit_dimensions((4000, 1000), (1920, 1080)), (1920, 480));
/// ```
pub fn calculate_fit_dimensions(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (box_w, box_h) = bounds;

    if src_w == 0 || src_h == 0 {
        return (box_w.max(1), box_h.max(1));
    }

    let scale = box_w as f64 / src_w as f64;
    let scaled_h = (src_h as f64 * scale) as u32;

    if scaled_h <= box_h {
        // Width-bound
        let h = (src_h as f64 * scale).round() as u32;
        (box_w.max(1), h.max(1))
    } else {
        // Height-bound
        let w = (src_w as f64 * box_h as f64 / src_h as f64).round() as u32;
        (w.max(1), box_h.max(1))
    }
}
