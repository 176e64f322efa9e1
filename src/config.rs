//! Configuration file parser for ~/.config/podbo/config.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`.
//! Unknown keys are accepted by serde but logged as warnings, since they are
//! usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::feed::{EntryPolicy, DEFAULT_MAX_FEED_SIZE};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file. `None` = `podbo.db` next to the config file.
    pub database_path: Option<PathBuf>,

    /// Per-fetch timeout in seconds. 0 = wait for the fetch to finish.
    pub fetch_timeout_secs: u64,

    /// Largest feed document accepted, in bytes.
    pub max_feed_bytes: usize,

    /// `"abort"` fails the whole episode batch on a bad entry, `"skip"` drops it.
    pub on_malformed_entry: EntryPolicy,

    /// User-Agent header sent with feed requests.
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            fetch_timeout_secs: 0,
            max_feed_bytes: DEFAULT_MAX_FEED_SIZE,
            on_malformed_entry: EntryPolicy::AbortBatch,
            user_agent: concat!("podbo/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 5] = [
        "database_path",
        "fetch_timeout_secs",
        "max_feed_bytes",
        "on_malformed_entry",
        "user_agent",
    ];

    /// Load configuration from a TOML file.
    ///
    /// A missing or blank file yields the defaults. Unknown keys only produce
    /// a warning; invalid TOML or a mistyped value is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match Self::read_file(path)? {
            Some(content) if !content.trim().is_empty() => content,
            _ => {
                tracing::debug!(path = %path.display(), "No config settings found, using defaults");
                return Ok(Self::default());
            }
        };

        Self::warn_unknown_keys(&content);

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            policy = ?config.on_malformed_entry,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Reads the config file, or `None` when there is none.
    fn read_file(path: &Path) -> Result<Option<String>, ConfigError> {
        let len = match std::fs::metadata(path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len > Self::MAX_FILE_SIZE {
            return Err(ConfigError::TooLarge(format!(
                "Config file is {} bytes (max {} bytes)",
                len,
                Self::MAX_FILE_SIZE
            )));
        }

        match std::fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn warn_unknown_keys(content: &str) {
        let Ok(table) = content.parse::<toml::Table>() else {
            return;
        };
        for key in table.keys() {
            if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                tracing::warn!(key = %key, "Unknown podbo setting, ignoring");
            }
        }
    }

    /// Fetch timeout, or `None` when fetches may block indefinitely.
    pub fn fetch_timeout(&self) -> Option<Duration> {
        match self.fetch_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
