//! Server configuration module.
//!
//! Handles loading, validating, and merging `infoscreen.toml`. Stock defaults
//! are serialized to a TOML table and the user file is merged on top, so the
//! file only needs the keys it changes. A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! repo_root = "rep"           # Content-addressed repository directory
//!
//! [sync]
//! interval_secs = 60          # Seconds between poll cycles
//!
//! [cache]
//! size_mb = 100               # Resized image cache budget (MiB)
//!
//! [processing]
//! max_processes = 4           # Max parallel workers (omit for auto = CPU cores)
//!
//! [logging]
//! level = "info"              # Overridden by RUST_LOG
//! file = "infoscreen.log"     # Optional, appended to
//!
//! [[screens]]
//! name = "main"
//! content_source_dir = ""     # Empty = feed disabled
//! content2_source_dir = ""
//! content3_source_dir = ""
//! image_source_dir = ""       # Mixin images
//! ticker_source_dir = ""
//! ticker_default_file = ""
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

const MB: u64 = 1024 * 1024;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding content-addressed copies of all media.
    pub repo_root: String,
    pub sync: SyncConfig,
    pub cache: CacheConfig,
    pub processing: ProcessingConfig,
    pub logging: LoggingConfig,
    /// Screen front-ends and the feeds each one shows.
    pub screens: Vec<ScreenConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repo_root: "rep".to_string(),
            sync: SyncConfig::default(),
            cache: CacheConfig::default(),
            processing: ProcessingConfig::default(),
            logging: LoggingConfig::default(),
            screens: vec![ScreenConfig::named("main")],
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.interval_secs == 0 {
            return Err(ConfigError::Validation(
                "sync.interval_secs must be non-zero".into(),
            ));
        }
        if self.cache.size_mb == 0 {
            return Err(ConfigError::Validation(
                "cache.size_mb must be non-zero".into(),
            ));
        }
        if self.screens.is_empty() {
            return Err(ConfigError::Validation(
                "at least one [[screens]] entry is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for screen in &self.screens {
            if screen.name.is_empty() {
                return Err(ConfigError::Validation(
                    "screens.name must not be empty".into(),
                ));
            }
            if !seen.insert(screen.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate screen name: {}",
                    screen.name
                )));
            }
        }
        Ok(())
    }

    pub fn screen(&self, name: &str) -> Option<&ScreenConfig> {
        self.screens.iter().find(|s| s.name == name)
    }
}

/// Poll cycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyncConfig {
    pub interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl SyncConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

/// Image derivative cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Byte budget in MiB.
    pub size_mb: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { size_mb: 100 }
    }
}

impl CacheConfig {
    pub fn size_bytes(&self) -> u64 {
        self.size_mb.saturating_mul(MB)
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel polling and ingest workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Optional log file, opened in append mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// One screen front-end. Empty paths disable the corresponding feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScreenConfig {
    pub name: String,
    pub content_source_dir: String,
    pub content2_source_dir: String,
    pub content3_source_dir: String,
    /// Mixin ("dia show") images interleaved with content.
    pub image_source_dir: String,
    pub ticker_source_dir: String,
    pub ticker_default_file: String,
}

impl ScreenConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values (arrays included) in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value; `Ok(None)` if it doesn't exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<Config, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, merged over stock defaults and validated.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    resolve_config(stock_defaults_value(), load_raw_config(path)?)
}

/// Returns a fully-commented stock `infoscreen.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Infoscreen Configuration
# ========================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directory for content-addressed copies of all images and videos.
# Files are named <digest>.<ext> and never modified once written.
repo_root = "rep"

# ---------------------------------------------------------------------------
# Polling
# ---------------------------------------------------------------------------
[sync]
# Seconds between re-scans of every feed. Feeds whose directory listing
# (names, sizes, modification times) did not change are skipped cheaply.
interval_secs = 60

# ---------------------------------------------------------------------------
# Resized image cache
# ---------------------------------------------------------------------------
[cache]
# Memory budget for resized images in MiB. Least recently used images are
# evicted once the budget is exceeded.
size_mb = 100

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for polling and ingesting.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Filter used when RUST_LOG is not set, e.g. "debug" or "info,infoscreen=debug".
level = "info"
# Append log lines to this file in addition to stdout.
# file = "infoscreen.log"

# ---------------------------------------------------------------------------
# Screens
# ---------------------------------------------------------------------------
# One [[screens]] table per front-end. An empty path disables that feed.
# Screens naming the same directory share a single feed.
[[screens]]
name = "main"
# Images and videos (.jpg .jpeg .png .webp .mp4 .mov), scanned recursively.
content_source_dir = ""
content2_source_dir = ""
content3_source_dir = ""
# Mixin images shown between content pages.
image_source_dir = ""
# Directory of .txt files; blank-line separated paragraphs become entries.
ticker_source_dir = ""
# Single text file; its first paragraph is shown when the ticker is empty.
ticker_default_file = ""
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.repo_root, "rep");
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.cache.size_mb, 100);
        assert_eq!(config.cache.size_bytes(), 100 * 1024 * 1024);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.screens, vec![ScreenConfig::named("main")]);
    }

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
[cache]
size_mb = 20
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.cache.size_mb, 20);
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.repo_root, "rep");
    }

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("infoscreen.toml")).unwrap();
        assert_eq!(config.sync.interval_secs, 60);
        assert_eq!(config.screens.len(), 1);
    }

    #[test]
    fn load_config_reads_screens() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("infoscreen.toml");
        fs::write(
            &path,
            r#"
repo_root = "/srv/rep"

[sync]
interval_secs = 5

[[screens]]
name = "lobby"
content_source_dir = "/srv/content"
ticker_source_dir = "/srv/ticker"

[[screens]]
name = "canteen"
image_source_dir = "/srv/mixin"
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.repo_root, "/srv/rep");
        assert_eq!(config.sync.interval(), Duration::from_secs(5));
        // Screens array replaces the default one entirely.
        assert_eq!(config.screens.len(), 2);
        let lobby = config.screen("lobby").unwrap();
        assert_eq!(lobby.content_source_dir, "/srv/content");
        assert_eq!(lobby.content2_source_dir, "");
        assert_eq!(config.screen("canteen").unwrap().image_source_dir, "/srv/mixin");
        assert!(config.screen("main").is_none());
    }

    #[test]
    fn unknown_keys_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("infoscreen.toml");
        fs::write(&path, "[cache]\nsize = 10\n").unwrap();
        assert!(matches!(load_config(&path), Err(ConfigError::Toml(_))));
    }

    #[test]
    fn unknown_screen_keys_rejected() {
        let toml = r#"
[[screens]]
name = "main"
content_dir = "/x"
"#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn zero_interval_is_invalid() {
        let mut config = Config::default();
        config.sync.interval_secs = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn zero_cache_is_invalid() {
        let mut config = Config::default();
        config.cache.size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_screen_names_are_invalid() {
        let mut config = Config::default();
        config.screens.push(ScreenConfig::named("main"));
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate screen name"));
    }

    #[test]
    fn empty_screen_list_is_invalid() {
        let mut config = Config::default();
        config.screens.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn stock_config_parses_to_defaults() {
        let config: Config = toml::from_str(stock_config_toml()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.repo_root, defaults.repo_root);
        assert_eq!(config.sync.interval_secs, defaults.sync.interval_secs);
        assert_eq!(config.cache.size_mb, defaults.cache.size_mb);
        assert_eq!(config.logging.level, defaults.logging.level);
        assert_eq!(config.screens, defaults.screens);
    }

    #[test]
    fn merge_overlay_wins_and_base_survives() {
        let base: toml::Value = toml::from_str("a = 1\n[t]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Value = toml::from_str("[t]\ny = 3\n").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["a"].as_integer(), Some(1));
        assert_eq!(merged["t"]["x"].as_integer(), Some(1));
        assert_eq!(merged["t"]["y"].as_integer(), Some(3));
    }

    #[test]
    fn effective_threads_never_zero() {
        let config = ProcessingConfig {
            max_processes: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }
}
