//! The process-wide set of feeds.
//!
//! A [`SourceRegistry`] is built once at startup and shared by reference
//! between the poller and whatever serves content to the screens. Its single
//! mutex is held only to read a feed's digest, to commit a finished update and
//! to take snapshots; scanning, hashing and copying happen outside it.
//!
//! Feeds are keyed by [`SourceKey`] (path + kind), so two screens configured
//! with the same ticker directory share one tracker and one serial.

use crate::config::ScreenConfig;
use crate::repository::Repository;
use crate::source::{self, ContentSource, PollOutcome, SourceError, SourceKey, SourceKind};
use crate::types::{ContentEntry, ScreenContent};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, error};

/// Feed keys of one screen front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    pub name: String,
    pub content: SourceKey,
    pub content2: SourceKey,
    pub content3: SourceKey,
    pub mixin: SourceKey,
    pub ticker: SourceKey,
    pub ticker_default: SourceKey,
}

impl Screen {
    pub fn from_config(config: &ScreenConfig) -> Self {
        Self {
            name: config.name.clone(),
            content: SourceKey::new(&config.content_source_dir, SourceKind::Info),
            content2: SourceKey::new(&config.content2_source_dir, SourceKind::Info),
            content3: SourceKey::new(&config.content3_source_dir, SourceKind::Info),
            mixin: SourceKey::new(&config.image_source_dir, SourceKind::DiaShow),
            ticker: SourceKey::new(&config.ticker_source_dir, SourceKind::Ticker),
            ticker_default: SourceKey::new(&config.ticker_default_file, SourceKind::TickerDefault),
        }
    }

    /// Keys in response order.
    pub fn keys(&self) -> [&SourceKey; 6] {
        [
            &self.content,
            &self.content2,
            &self.content3,
            &self.mixin,
            &self.ticker,
            &self.ticker_default,
        ]
    }
}

/// Entries of several feeds read under one lock, with their summed serial.
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    pub feeds: Vec<(SourceKey, Arc<[ContentEntry]>)>,
    pub serial: u64,
}

/// Committed state of one feed, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedStatus {
    pub key: SourceKey,
    pub serial: u64,
    pub entries: usize,
    pub digest: String,
}

pub struct SourceRegistry {
    repository: Repository,
    sources: Mutex<BTreeMap<SourceKey, ContentSource>>,
}

impl SourceRegistry {
    pub fn new(repository: Repository) -> Self {
        Self {
            repository,
            sources: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<SourceKey, ContentSource>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get or create the feed for `key`.
    pub fn register(&self, key: &SourceKey) {
        self.lock()
            .entry(key.clone())
            .or_insert_with(|| ContentSource::new(key.clone()));
    }

    /// Register every feed of a screen.
    pub fn register_screen(&self, config: &ScreenConfig) -> Screen {
        let screen = Screen::from_config(config);
        for key in screen.keys() {
            self.register(key);
        }
        screen
    }

    pub fn keys(&self) -> Vec<SourceKey> {
        self.lock().keys().cloned().collect()
    }

    /// Run one poll cycle for a single feed.
    pub fn poll(&self, key: &SourceKey) -> Result<PollOutcome, SourceError> {
        let last_digest = self
            .lock()
            .get(key)
            .map(|s| s.last_digest().to_string())
            .unwrap_or_default();

        let update = source::check(key, &last_digest, &self.repository)?;

        let mut sources = self.lock();
        let source = sources
            .entry(key.clone())
            .or_insert_with(|| ContentSource::new(key.clone()));
        Ok(source.apply(update))
    }

    /// Poll every registered feed; feeds run in parallel and independently.
    pub fn poll_all(&self) -> Vec<(SourceKey, Result<PollOutcome, SourceError>)> {
        self.keys()
            .into_par_iter()
            .map(|key| {
                let result = self.poll(&key);
                match &result {
                    Ok(outcome) => debug!(feed = %key, ?outcome, "polled feed"),
                    Err(e) => error!(feed = %key, error = %e, "poll failed, keeping previous content"),
                }
                (key, result)
            })
            .collect()
    }

    /// Entries of `keys` plus the sum of their serials, read atomically.
    pub fn content(&self, keys: &[&SourceKey]) -> ContentSnapshot {
        let sources = self.lock();
        let mut serial = 0;
        let feeds = keys
            .iter()
            .map(|&key| match sources.get(key) {
                Some(source) => {
                    serial += source.serial();
                    (key.clone(), source.entries())
                }
                None => (key.clone(), key.kind.empty_entries().into()),
            })
            .collect();
        ContentSnapshot { feeds, serial }
    }

    /// Everything a screen displays, in its wire shape.
    pub fn screen_content(&self, screen: &Screen) -> ScreenContent {
        let snapshot = self.content(&screen.keys());
        let mut feeds = snapshot.feeds.into_iter().map(|(_, entries)| entries.to_vec());
        let mut next = || feeds.next().unwrap_or_default();

        let content_images = next();
        let content2_images = next();
        let content3_images = next();
        let mixin_images = next();
        let ticker = next();
        let ticker_default = next()
            .into_iter()
            .next()
            .map(|e| e.text)
            .unwrap_or_default();

        ScreenContent {
            content_images,
            content2_images,
            content3_images,
            mixin_images,
            ticker,
            ticker_default,
            serial: snapshot.serial,
        }
    }

    pub fn statuses(&self) -> Vec<FeedStatus> {
        self.lock()
            .values()
            .map(|s| FeedStatus {
                key: s.key().clone(),
                serial: s.serial(),
                entries: s.entries().len(),
                digest: s.last_digest().to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{screen_config, test_repository, write_file};
    use tempfile::TempDir;

    #[test]
    fn screens_share_identical_feeds() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(test_repository(&tmp));
        let ticker = tmp.path().join("ticker");

        let mut a = screen_config("lobby");
        a.ticker_source_dir = ticker.to_string_lossy().to_string();
        let mut b = screen_config("canteen");
        b.ticker_source_dir = ticker.to_string_lossy().to_string();

        let sa = registry.register_screen(&a);
        let sb = registry.register_screen(&b);
        assert_eq!(sa.ticker, sb.ticker);

        // Disabled feeds collapse to one key per kind, plus the shared ticker.
        assert_eq!(registry.keys().len(), 4);
    }

    #[test]
    fn screen_content_sums_serials() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(test_repository(&tmp));
        let content = tmp.path().join("content");
        let ticker = tmp.path().join("ticker");
        write_file(&content, "a.jpg", b"a");
        write_file(&ticker, "news.txt", b"Breaking\n\nNews");
        let default = write_file(tmp.path(), "default.txt", b"Hello");

        let mut config = screen_config("main");
        config.content_source_dir = content.to_string_lossy().to_string();
        config.ticker_source_dir = ticker.to_string_lossy().to_string();
        config.ticker_default_file = default.to_string_lossy().to_string();
        let screen = registry.register_screen(&config);

        registry.poll_all();
        let first = registry.screen_content(&screen);
        assert_eq!(first.serial, 3);
        assert_eq!(first.content_images.len(), 1);
        assert_eq!(first.ticker.len(), 2);
        assert_eq!(first.ticker_default, "Hello");
        assert!(first.mixin_images.is_empty());

        registry.poll_all();
        assert_eq!(registry.screen_content(&screen).serial, 3);

        write_file(&ticker, "more.txt", b"Extra");
        registry.poll_all();
        let third = registry.screen_content(&screen);
        assert_eq!(third.serial, 4);
        assert_eq!(third.ticker.len(), 3);
    }

    #[test]
    fn failed_poll_leaves_feed_untouched() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(test_repository(&tmp));
        let content = tmp.path().join("content");
        write_file(&content, "a.jpg", b"a");
        let key = SourceKey::new(&content, SourceKind::Info);
        registry.register(&key);

        registry.poll(&key).unwrap();
        std::fs::remove_dir_all(&content).unwrap();

        assert!(registry.poll(&key).is_err());
        let snapshot = registry.content(&[&key]);
        assert_eq!(snapshot.serial, 1);
        assert_eq!(snapshot.feeds[0].1.len(), 1);
    }

    #[test]
    fn unknown_keys_read_as_empty() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(test_repository(&tmp));
        let key = SourceKey::new("/nowhere", SourceKind::TickerDefault);

        let snapshot = registry.content(&[&key]);
        assert_eq!(snapshot.serial, 0);
        assert_eq!(snapshot.feeds[0].1.len(), 1);
    }

    #[test]
    fn statuses_report_every_feed() {
        let tmp = TempDir::new().unwrap();
        let registry = SourceRegistry::new(test_repository(&tmp));
        registry.register_screen(&screen_config("main"));

        let statuses = registry.statuses();
        assert_eq!(statuses.len(), 4);
        assert!(statuses.iter().all(|s| s.serial == 0));
    }
}
