//! Ticker text files.
//!
//! A ticker file is plain text. Paragraphs separated by one or more blank
//! lines become one ticker entry each; the lines of a paragraph are trimmed
//! and joined with single spaces.
//!
//! ```text
//! Opening hours changed        →  "Opening hours changed from Monday on"
//! from Monday on
//!                              →  "Canteen closed on Friday"
//! Canteen closed on Friday
//! ```
//!
//! Decoding and splitting are separate steps: [`repair_charset`] turns raw
//! bytes into text (UTF-8, else Windows-1252, else lossy), and
//! [`parse_ticker_text`] runs the paragraph state machine on the result.

use encoding_rs::WINDOWS_1252;
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, error, warn};

/// Decode ticker bytes to text.
///
/// Valid UTF-8 is used as is (minus a leading byte order mark). Anything else
/// is decoded as Windows-1252, the codepage legacy editors on the screen PCs
/// save in. Should that decoder report errors the bytes are passed through
/// lossily and a warning is logged.
pub fn repair_charset(bytes: &[u8]) -> Cow<'_, str> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text));
    }

    debug!("ticker text is not UTF-8, decoding as windows-1252");
    let (text, had_errors) = WINDOWS_1252.decode_without_bom_handling(bytes);
    if had_errors {
        warn!("windows-1252 decoding failed, passing ticker bytes through");
        return String::from_utf8_lossy(bytes);
    }
    text
}

/// Split text into blank-line separated, space-joined paragraphs.
pub fn parse_ticker_text(text: &str) -> Vec<String> {
    let mut entries = Vec::new();
    let mut current = String::new();
    let mut collecting = false;

    for line in text.split('\n') {
        let line = line.trim();

        if line.is_empty() {
            if collecting {
                entries.push(std::mem::take(&mut current));
                collecting = false;
            }
            continue;
        }

        if collecting {
            current.push(' ');
        }
        current.push_str(line);
        collecting = true;
    }

    if collecting {
        entries.push(current);
    }

    entries
}

/// Read and parse a ticker file. An unreadable file yields no entries.
pub fn parse_ticker_file(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(bytes) => parse_ticker_text(&repair_charset(&bytes)),
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read ticker file");
            Vec::new()
        }
    }
}
