//! File classification by extension.
//!
//! | Kind | Extensions |
//! |------|------------|
//! | Image | `jpg`, `jpeg`, `png`, `webp` |
//! | Video | `mp4`, `mov` |
//! | Text | `txt` |
//!
//! Matching is case-insensitive and looks only at the final extension.

use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov"];
const TEXT_EXTENSIONS: &[&str] = &["txt"];

fn extension_in(path: &Path, list: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|ext| list.contains(&ext.as_str()))
}

pub fn is_image(path: &Path) -> bool {
    extension_in(path, IMAGE_EXTENSIONS)
}

pub fn is_video(path: &Path) -> bool {
    extension_in(path, VIDEO_EXTENSIONS)
}

pub fn is_text(path: &Path) -> bool {
    extension_in(path, TEXT_EXTENSIONS)
}

pub fn is_image_or_video(path: &Path) -> bool {
    is_image(path) || is_video(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn images_match_case_insensitively() {
        assert!(is_image(Path::new("001-dawn.JPG")));
        assert!(is_image(Path::new("x/y/z.png")));
        assert!(is_image(Path::new("a.webp")));
        assert!(!is_image(Path::new("a.gif")));
    }

    #[test]
    fn videos_are_not_images() {
        assert!(is_video(Path::new("clip.MOV")));
        assert!(!is_image(Path::new("clip.mp4")));
        assert!(is_image_or_video(Path::new("clip.mp4")));
    }

    #[test]
    fn no_extension_matches_nothing() {
        assert!(!is_image_or_video(Path::new("README")));
        assert!(!is_text(Path::new("txt")));
    }

    #[test]
    fn only_last_extension_counts() {
        assert!(is_text(Path::new("news.jpg.txt")));
        assert!(!is_image(Path::new("news.jpg.txt")));
    }
}
