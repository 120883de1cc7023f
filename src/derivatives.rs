//! Resized renditions of repository images.
//!
//! Screens request every image at their own display size. [`ImageService`]
//! answers `get_image(name, width, height)` from the [`ImageCache`] when it
//! can, and otherwise fit-resizes the repository original, caches the encoded
//! bytes and returns them. A failed render is reported and nothing is cached.

use crate::cache::ImageCache;
use crate::imaging::{self, BackendError, ImageBackend};
use crate::media;
use crate::repository::Repository;
use std::path::{Component, Path};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

#[derive(Error, Debug)]
pub enum DerivativeError {
    #[error("invalid image name: {0:?}")]
    InvalidName(String),
    #[error("image not found in repository: {0}")]
    NotFound(String),
    #[error("failed to render {name}: {source}")]
    Backend {
        name: String,
        #[source]
        source: BackendError,
    },
}

/// Whether `name` is a single plain path component, e.g. `abc.jpg`.
pub fn is_bare_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}

pub struct ImageService<B: ImageBackend> {
    repository: Repository,
    cache: ImageCache,
    backend: B,
}

impl<B: ImageBackend> ImageService<B> {
    pub fn new(repository: Repository, cache: ImageCache, backend: B) -> Self {
        Self {
            repository,
            cache,
            backend,
        }
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Encoded PNG of repository image `name` fitted into `width` x `height`.
    pub fn get_image(
        &self,
        name: &str,
        width: u32,
        height: u32,
    ) -> Result<Arc<[u8]>, DerivativeError> {
        if !is_bare_name(name) {
            return Err(DerivativeError::InvalidName(name.to_string()));
        }
        if let Some(bytes) = self.cache.get(name, width, height) {
            return Ok(bytes);
        }

        let path = self.repository.path_of(name);
        if !media::is_image(&path) || !path.is_file() {
            return Err(DerivativeError::NotFound(name.to_string()));
        }

        info!(%name, width, height, "sizing image");
        let fitted = imaging::create_fitted_image(&self.backend, &path, width, height)
            .map_err(|source| {
                error!(%name, error = %source, "failed to size image");
                DerivativeError::Backend {
                    name: name.to_string(),
                    source,
                }
            })?;

        self.cache.put(name, width, height, &fitted.bytes);
        Ok(fitted.bytes.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::RustBackend;
    use crate::imaging::backend::Dimensions;
    use crate::imaging::backend::tests::MockBackend;
    use crate::test_helpers::{create_test_jpeg, test_repository, write_file};
    use tempfile::TempDir;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions { width, height }
    }

    #[test]
    fn bare_names_only() {
        assert!(is_bare_name("abc.jpg"));
        assert!(!is_bare_name(""));
        assert!(!is_bare_name("."));
        assert!(!is_bare_name(".."));
        assert!(!is_bare_name("../secret.jpg"));
        assert!(!is_bare_name("sub/abc.jpg"));
        assert!(!is_bare_name("/etc/passwd"));
        assert!(!is_bare_name("sub\\abc.jpg"));
    }

    #[test]
    fn second_request_is_served_from_cache() {
        let tmp = TempDir::new().unwrap();
        let repo = test_repository(&tmp);
        write_file(repo.root(), "abc.jpg", b"pretend jpeg");
        let service = ImageService::new(
            repo,
            ImageCache::new(1024),
            MockBackend::with_dimensions(vec![dims(800, 600)]),
        );

        let first = service.get_image("abc.jpg", 400, 400).unwrap();
        let second = service.get_image("abc.jpg", 400, 400).unwrap();
        assert_eq!(&*first, b"400x300");
        assert_eq!(first, second);
        assert_eq!(service.backend.resize_count(), 1);
        assert_eq!(service.cache().stats().hits, 1);
    }

    #[test]
    fn different_sizes_render_separately() {
        let tmp = TempDir::new().unwrap();
        let repo = test_repository(&tmp);
        write_file(repo.root(), "abc.jpg", b"pretend jpeg");
        let service = ImageService::new(
            repo,
            ImageCache::new(1024),
            MockBackend::with_dimensions(vec![dims(800, 600), dims(800, 600)]),
        );

        assert_eq!(&*service.get_image("abc.jpg", 100, 200).unwrap(), b"100x75");
        assert_eq!(&*service.get_image("abc.jpg", 200, 100).unwrap(), b"133x100");
        assert_eq!(service.cache().len(), 2);
    }

    #[test]
    fn traversal_is_rejected_before_touching_disk() {
        let tmp = TempDir::new().unwrap();
        let service = ImageService::new(
            test_repository(&tmp),
            ImageCache::new(1024),
            MockBackend::new(),
        );

        let result = service.get_image("../config.toml", 10, 10);
        assert!(matches!(result, Err(DerivativeError::InvalidName(_))));
        assert!(service.backend.get_operations().is_empty());
    }

    #[test]
    fn missing_and_non_image_names_are_not_found() {
        let tmp = TempDir::new().unwrap();
        let repo = test_repository(&tmp);
        write_file(repo.root(), "clip.mp4", b"video");
        let service = ImageService::new(repo, ImageCache::new(1024), MockBackend::new());

        assert!(matches!(
            service.get_image("nope.jpg", 10, 10),
            Err(DerivativeError::NotFound(_))
        ));
        assert!(matches!(
            service.get_image("clip.mp4", 10, 10),
            Err(DerivativeError::NotFound(_))
        ));
    }

    #[test]
    fn render_failure_caches_nothing() {
        let tmp = TempDir::new().unwrap();
        let repo = test_repository(&tmp);
        write_file(repo.root(), "abc.png", b"pretend png");
        // No dimensions queued: identify fails.
        let service = ImageService::new(repo, ImageCache::new(1024), MockBackend::new());

        assert!(matches!(
            service.get_image("abc.png", 10, 10),
            Err(DerivativeError::Backend { .. })
        ));
        assert!(service.cache().is_empty());
    }

    #[test]
    fn real_backend_produces_fitted_png() {
        let tmp = TempDir::new().unwrap();
        let repo = test_repository(&tmp);
        create_test_jpeg(&repo.path_of("photo.jpg"), 400, 300);
        let service = ImageService::new(repo, ImageCache::new(1024 * 1024), RustBackend::new());

        let bytes = service.get_image("photo.jpg", 100, 100).unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!((img.width(), img.height()), (100, 75));
    }
}
