//! Shared types handed to the serving layer.
//!
//! These are serialized to JSON for the screen front-ends, so field names and
//! the one-letter `type` tags are part of the wire format.

use serde::{Deserialize, Serialize};

/// What a [`ContentEntry`] points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    #[serde(rename = "i")]
    Image,
    #[serde(rename = "v")]
    Video,
    #[serde(rename = "t")]
    Text,
}

/// One displayable item of a feed.
///
/// Images and videos carry the repository name in `locator` and an empty
/// `text`; ticker entries carry their paragraph in `text` and no locator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(rename = "repo_url")]
    pub locator: String,
    pub text: String,
}

impl ContentEntry {
    pub fn image(name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Image,
            locator: name.into(),
            text: String::new(),
        }
    }

    pub fn video(name: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Video,
            locator: name.into(),
            text: String::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Text,
            locator: String::new(),
            text: text.into(),
        }
    }
}

/// Everything one screen displays, plus the summed serial of its feeds.
///
/// Clients poll this and reload only when `serial` changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenContent {
    pub content_images: Vec<ContentEntry>,
    pub content2_images: Vec<ContentEntry>,
    pub content3_images: Vec<ContentEntry>,
    pub mixin_images: Vec<ContentEntry>,
    pub ticker: Vec<ContentEntry>,
    pub ticker_default: String,
    pub serial: u64,
}
