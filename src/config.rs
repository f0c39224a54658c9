//! Configuration loading for dealwatch.
//!
//! Values come from three layers, later layers winning:
//!
//! 1. an optional TOML file (`dealwatch.toml` by default)
//! 2. environment variables (`DEALWATCH_*`, falling back to the older
//!    `SQLITE_DB_FILE`/`DISCORD_WEBHOOK`/`OZBARGIN_RSS_FEED` names); `main`
//!    loads a `.env` file into the environment first
//! 3. command-line flags (applied by `main`)
//!
//! [`Config::into_settings`] then checks that the three required values are
//! present and turns everything into the typed [`Settings`] handed to each
//! component.
use secrecy::SecretString;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::notify::DEFAULT_AVATAR_URL;
use crate::poller::PollSettings;

/// Prefix joined with each listing's node id
pub const DEFAULT_NODE_BASE_URL: &str = "https://www.ozbargain.com.au/node";

pub const ENV_DB_PATH: &str = "DEALWATCH_DB_PATH";
pub const ENV_WEBHOOK_URL: &str = "DEALWATCH_WEBHOOK_URL";
pub const ENV_FEED_URL: &str = "DEALWATCH_FEED_URL";

/// Older deployments' variable names, read when the `DEALWATCH_*` one is unset
pub const LEGACY_ENV_DB_PATH: &str = "SQLITE_DB_FILE";
pub const LEGACY_ENV_WEBHOOK_URL: &str = "DISCORD_WEBHOOK";
pub const LEGACY_ENV_FEED_URL: &str = "OZBARGIN_RSS_FEED";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// A required value was not set by any layer.
    #[error("Missing required setting `{0}`")]
    Missing(&'static str),

    #[error("Setting `{key}` is not a valid http(s) URL: {reason}")]
    InvalidUrl { key: &'static str, reason: String },

    #[error("Setting `{0}` must be greater than zero")]
    Invalid(&'static str),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Raw, layered configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// The webhook url is masked in `Debug` output since it carries the posting
/// token.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite file holding seen listings. Required.
    pub db_path: Option<String>,

    /// Discord webhook address. Required.
    pub webhook_url: Option<String>,

    /// Feed address to poll. Required.
    pub feed_url: Option<String>,

    pub node_base_url: String,
    pub avatar_url: String,
    pub poll_interval_secs: u64,
    pub notify_retry_secs: u64,
    pub entry_pause_secs: u64,
    pub retention_days: u64,
    pub fetch_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            webhook_url: None,
            feed_url: None,
            node_base_url: DEFAULT_NODE_BASE_URL.to_string(),
            avatar_url: DEFAULT_AVATAR_URL.to_string(),
            poll_interval_secs: 300,
            notify_retry_secs: 60,
            entry_pause_secs: 1,
            retention_days: 30,
            fetch_timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("db_path", &self.db_path)
            .field(
                "webhook_url",
                &self.webhook_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("feed_url", &self.feed_url)
            .field("node_base_url", &self.node_base_url)
            .field("avatar_url", &self.avatar_url)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("notify_retry_secs", &self.notify_retry_secs)
            .field("entry_pause_secs", &self.entry_pause_secs)
            .field("retention_days", &self.retention_days)
            .field("fetch_timeout_secs", &self.fetch_timeout_secs)
            .finish()
    }
}

/// Validated settings, passed to each component at construction.
#[derive(Debug)]
pub struct Settings {
    pub db_path: String,
    pub webhook_url: SecretString,
    pub feed_url: String,
    pub avatar_url: String,
    pub fetch_timeout: Duration,
    pub notify_retry_delay: Duration,
    pub poll: PollSettings,
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 10] = [
        "db_path",
        "webhook_url",
        "feed_url",
        "node_base_url",
        "avatar_url",
        "poll_interval_secs",
        "notify_retry_secs",
        "entry_pause_secs",
        "retention_days",
        "fetch_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
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

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Override the required values from the environment.
    ///
    /// `DEALWATCH_*` wins; `SQLITE_DB_FILE`, `DISCORD_WEBHOOK` and
    /// `OZBARGIN_RSS_FEED` are accepted when it is unset.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let first_set = |key: &str, legacy: &str| non_empty(key).or_else(|| non_empty(legacy));
        if let Some(v) = first_set(ENV_DB_PATH, LEGACY_ENV_DB_PATH) {
            self.db_path = Some(v);
        }
        if let Some(v) = first_set(ENV_WEBHOOK_URL, LEGACY_ENV_WEBHOOK_URL) {
            self.webhook_url = Some(v);
        }
        if let Some(v) = first_set(ENV_FEED_URL, LEGACY_ENV_FEED_URL) {
            self.feed_url = Some(v);
        }
    }

    /// Validate and convert into [`Settings`].
    pub fn into_settings(self) -> Result<Settings, ConfigError> {
        let db_path = required(self.db_path, "db_path")?;
        let webhook_url = required(self.webhook_url, "webhook_url")?;
        let feed_url = required(self.feed_url, "feed_url")?;

        check_http_url("webhook_url", &webhook_url)?;
        check_http_url("feed_url", &feed_url)?;
        check_http_url("node_base_url", &self.node_base_url)?;

        let poll_interval = non_zero_secs("poll_interval_secs", self.poll_interval_secs)?;
        let notify_retry_delay = non_zero_secs("notify_retry_secs", self.notify_retry_secs)?;
        let fetch_timeout = non_zero_secs("fetch_timeout_secs", self.fetch_timeout_secs)?;
        if self.retention_days == 0 {
            return Err(ConfigError::Invalid("retention_days"));
        }

        Ok(Settings {
            db_path,
            webhook_url: SecretString::from(webhook_url),
            feed_url,
            avatar_url: self.avatar_url,
            fetch_timeout,
            notify_retry_delay,
            poll: PollSettings {
                poll_interval,
                entry_pause: Duration::from_secs(self.entry_pause_secs),
                retention: Duration::from_secs(self.retention_days.saturating_mul(24 * 60 * 60)),
                node_base_url: self.node_base_url,
            },
        })
    }
}

fn required(value: Option<String>, key: &'static str) -> Result<String, ConfigError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

fn check_http_url(key: &'static str, value: &str) -> Result<(), ConfigError> {
    let parsed = url::Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        key,
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(ConfigError::InvalidUrl {
            key,
            reason: format!("unsupported scheme {scheme}"),
        }),
    }
}

fn non_zero_secs(key: &'static str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Invalid(key));
    }
    Ok(Duration::from_secs(secs))
}

// ============================================================================
// Tests
// ============================================================================
