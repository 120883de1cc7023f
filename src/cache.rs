//! In-memory cache of resized images.
//!
//! Resizing is the expensive part of serving a screen: the same repository
//! image is requested at the same few display sizes over and over. This
//! module keeps the encoded bytes of recent derivatives under a byte budget.
//!
//! # Design
//!
//! ## Keys
//!
//! One entry per `(name, width, height)`, keyed as `"{name}/{width}/{height}"`.
//! Repository names never contain `/`, so the key is unambiguous and a
//! 100x200 rendition never collides with a 200x100 one.
//!
//! ## Recency
//!
//! Every entry records the logical time of its last access. A hit only takes
//! the read lock and refreshes that stamp atomically, so concurrent hits do
//! not serialize on each other. Times come from a process-wide counter rather
//! than the wall clock so two accesses are always strictly ordered.
//!
//! ## Eviction
//!
//! `put` accounts the size delta and, when the total exceeds the budget,
//! sweeps synchronously: entries are sorted by last access, oldest first, and
//! removed until the total is at or under budget.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Cache key for a derivative of `name` at the given size.
pub fn cache_key(name: &str, width: u32, height: u32) -> String {
    format!("{name}/{width}/{height}")
}

struct CacheEntry {
    bytes: Arc<[u8]>,
    last_access: AtomicU64,
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    size: u64,
}

/// Counters and occupancy of an [`ImageCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub bytes: u64,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cached ({} bytes), {} hits, {} misses",
            self.entries, self.bytes, self.hits, self.misses
        )
    }
}

/// Byte-bounded cache of resized image bytes with recency eviction.
pub struct ImageCache {
    limit: u64,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    state: RwLock<CacheState>,
}

impl ImageCache {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit: limit_bytes,
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            state: RwLock::new(CacheState::default()),
        }
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Look up a derivative, refreshing its recency on a hit.
    pub fn get(&self, name: &str, width: u32, height: u32) -> Option<Arc<[u8]>> {
        let key = cache_key(name, width, height);
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        match state.entries.get(&key) {
            Some(entry) => {
                entry.last_access.store(self.tick(), Ordering::Relaxed);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%key, "cache hit");
                Some(Arc::clone(&entry.bytes))
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a copy of `bytes`, replacing any previous entry for the key, and
    /// evict until the cache is back under budget.
    pub fn put(&self, name: &str, width: u32, height: u32, bytes: &[u8]) {
        let key = cache_key(name, width, height);
        let entry = CacheEntry {
            bytes: Arc::from(bytes),
            last_access: AtomicU64::new(self.tick()),
        };
        let added = bytes.len() as u64;

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        match state.entries.insert(key, entry) {
            Some(old) => {
                let removed = old.bytes.len() as u64;
                state.size = release(state.size, removed);
                state.size += added;
            }
            None => state.size += added,
        }

        if state.size > self.limit {
            self.evict(&mut state);
        }
    }

    fn evict(&self, state: &mut CacheState) {
        let mut by_age: Vec<(u64, String)> = state
            .entries
            .iter()
            .map(|(key, e)| (e.last_access.load(Ordering::Relaxed), key.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, key) in by_age {
            if state.size <= self.limit {
                break;
            }
            if let Some(entry) = state.entries.remove(&key) {
                state.size = release(state.size, entry.bytes.len() as u64);
                debug!(%key, "evicted");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes currently accounted to cached entries.
    pub fn size(&self) -> u64 {
        self.state.read().unwrap_or_else(PoisonError::into_inner).size
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: state.entries.len(),
            bytes: state.size,
        }
    }
}

/// Subtract `bytes` from the running total, clamping at zero.
fn release(size: u64, bytes: u64) -> u64 {
    size.checked_sub(bytes).unwrap_or_else(|| {
        warn!(size, bytes, "cache size accounting went negative, clamping to zero");
        0
    })
}
