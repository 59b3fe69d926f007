//! Configuration file parser for ~/.config/newsdesk/config.toml.
//!
//! The config file is optional. A missing or empty file yields
//! `Config::default()`. Unknown keys are accepted but logged as warnings, since
//! they are usually typos.
use crate::api::DEFAULT_BASE_URL;
use crate::collection::{PagingStrategy, Reconcile};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable that overrides `base_url`.
pub const BASE_URL_ENV: &str = "NEWSDESK_BASE_URL";

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

    #[error("Invalid config value for '{key}': {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// Every field has a default, so any subset of keys may be given.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// CMS API root, e.g. `https://cms.example.com/api`.
    pub base_url: String,

    pub request_timeout_secs: u64,

    /// Rows per page in the admin article and category lists.
    pub admin_page_size: usize,

    /// Cards per page in the public reader list.
    pub reader_page_size: usize,

    /// Whether the category list slices locally or asks the server for one page.
    pub category_paging: PagingStrategy,

    /// How the local list is brought up to date after a create or update.
    pub reconcile: Reconcile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            admin_page_size: 10,
            reader_page_size: 9,
            category_paging: PagingStrategy::ClientSide,
            reconcile: Reconcile::Refetch,
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "base_url",
    "request_timeout_secs",
    "admin_page_size",
    "reader_page_size",
    "category_paging",
    "reconcile",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing or empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line info
    /// - Zero page size or timeout → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys().filter(|k| !KNOWN_KEYS.contains(&k.as_str())) {
                tracing::warn!(key = %key, "Unknown key in config file, ignoring");
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            base_url = %config.base_url,
            category_paging = ?config.category_paging,
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("admin_page_size", self.admin_page_size == 0),
            ("reader_page_size", self.reader_page_size == 0),
            ("request_timeout_secs", self.request_timeout_secs == 0),
        ];
        for (key, is_zero) in checks {
            if is_zero {
                return Err(ConfigError::Invalid {
                    key,
                    reason: "must be greater than zero".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply a `NEWSDESK_BASE_URL` value, which wins over the file.
    pub fn with_base_url_override(mut self, value: Option<String>) -> Self {
        if let Some(url) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            tracing::debug!(base_url = %url, "Base URL overridden from environment");
            self.base_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
