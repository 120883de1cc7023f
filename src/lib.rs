//! # Infoscreen
//!
//! The content core behind a set of info screens. Editors drop images, videos
//! and ticker text into plain directories; this crate turns those directories
//! into versioned feeds that screen front-ends poll, and serves images resized
//! to each screen's display.
//!
//! # Architecture: Poll, Ingest, Serve
//!
//! ```text
//! 1. Poll     feed dirs  →  scan digest       (cheap: names, sizes, mtimes)
//! 2. Ingest   changed    →  rep/<digest>.ext  (content-addressed copies)
//! 3. Serve    screen     →  entries + serial, resized PNGs from cache
//! ```
//!
//! - **Change detection is cheap**: an unchanged directory costs one walk and
//!   no file reads, so the poll interval can be short.
//! - **Copies are immutable**: a repository file's name is the keyed hash of
//!   its content, so re-ingesting is a no-op and the name can be cached
//!   forever by clients.
//! - **Serials tell clients when to reload**: each feed bumps its serial only
//!   when its entry list actually changes; a screen sums the serials of its
//!   feeds.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`digest`] | Keyed HMAC-SHA-256 file digests and stamp accumulation |
//! | [`repository`] | Content-addressed store with copy-then-publish ingestion |
//! | [`media`] | Image / video / text classification by extension |
//! | [`scan`] | Sorted recursive walk producing a directory digest |
//! | [`ticker`] | Ticker text decoding and paragraph splitting |
//! | [`types`] | Entries and screen content handed to the serving layer |
//! | [`source`] | Feed kinds, feed state and the two-phase poll cycle |
//! | [`registry`] | Process-wide feed set, screens and content snapshots |
//! | [`poller`] | Background thread driving the poll cycle on an interval |
//! | [`cache`] | Byte-bounded derivative cache with recency eviction |
//! | [`imaging`] | Decode, fit-resize and PNG encode behind a backend trait |
//! | [`derivatives`] | `get_image(name, w, h)`: cache lookup or render and populate |
//! | [`config`] | `infoscreen.toml` loading, merging and validation |
//! | [`output`] | CLI output formatting for cycles and feed state |
//!
//! # Design Decisions
//!
//! ## No Global State
//!
//! The registry, the cache and the image service are plain values built once
//! by the binary and passed by reference (or `Arc`) to the poller and to
//! whatever serves requests. Tests build as many isolated instances as they
//! like.
//!
//! ## Disk Work Outside Locks
//!
//! Polling a feed reads its last digest under the registry lock, releases it,
//! scans and copies, then re-acquires the lock only to commit. Readers never
//! wait on disk and never see a half-updated feed.

pub mod cache;
pub mod config;
pub mod derivatives;
pub mod digest;
pub mod imaging;
pub mod media;
pub mod output;
pub mod poller;
pub mod registry;
pub mod repository;
pub mod scan;
pub mod source;
pub mod ticker;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
