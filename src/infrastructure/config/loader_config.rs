//! Loader configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::infrastructure::image::decoder::{DEFAULT_MAX_DECODE_BYTES, DEFAULT_TARGET_SIZE};
use crate::infrastructure::image::disk_cache::{DEFAULT_MAX_CACHE_SIZE, default_cache_dir};
use crate::infrastructure::image::memory_cache::{DEFAULT_CACHE_BYTES, DEFAULT_CACHE_ENTRIES};

/// Log level configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to tracing level.
    #[must_use]
    pub const fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Configuration for the image loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Number of tasks resolved concurrently.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Connect timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Per-read timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub read_timeout_secs: u64,

    /// Redirects followed before a fetch fails.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User agent sent with every fetch.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Smallest side a downsampled image keeps.
    #[serde(default = "default_target_size")]
    pub target_size: u32,

    /// Largest allocation a single decode may make.
    #[serde(default = "default_max_decode_bytes")]
    pub max_decode_bytes: u64,

    /// Maximum images in memory cache.
    #[serde(default = "default_memory_cache_entries")]
    pub memory_cache_entries: usize,

    /// Pixel budget of the memory cache in bytes.
    #[serde(default = "default_memory_cache_bytes")]
    pub memory_cache_bytes: usize,

    /// Maximum disk cache size in bytes.
    #[serde(default = "default_disk_cache_bytes")]
    pub disk_cache_bytes: u64,

    /// Disk cache directory. Defaults to the platform cache dir.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// Consumers carrying this tag are hidden instead of showing the
    /// default image when their load fails.
    #[serde(default)]
    pub collapse_tag: Option<String>,

    /// Log verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Log file path. Logs go to stderr when unset.
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

impl LoaderConfig {
    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the per-read timeout.
    #[must_use]
    pub const fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Returns the effective disk cache directory.
    #[must_use]
    pub fn effective_cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(default_cache_dir)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this struct.
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

fn default_worker_count() -> usize {
    5
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    10
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::NAME, crate::VERSION)
}

fn default_target_size() -> u32 {
    DEFAULT_TARGET_SIZE
}

fn default_max_decode_bytes() -> u64 {
    DEFAULT_MAX_DECODE_BYTES
}

fn default_memory_cache_entries() -> usize {
    DEFAULT_CACHE_ENTRIES
}

fn default_memory_cache_bytes() -> usize {
    DEFAULT_CACHE_BYTES
}

fn default_disk_cache_bytes() -> u64 {
    DEFAULT_MAX_CACHE_SIZE
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            connect_timeout_secs: default_timeout_secs(),
            read_timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            target_size: default_target_size(),
            max_decode_bytes: default_max_decode_bytes(),
            memory_cache_entries: default_memory_cache_entries(),
            memory_cache_bytes: default_memory_cache_bytes(),
            disk_cache_bytes: default_disk_cache_bytes(),
            cache_dir: None,
            collapse_tag: None,
            log_level: LogLevel::Info,
            log_path: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoaderConfig::default();

        assert_eq!(config.worker_count, 5);
        assert_eq!(config.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.target_size, 70);
        assert!(config.collapse_tag.is_none());
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_content = r#"
            worker_count = 2
            collapse_tag = "banner"
            log_level = "debug"
            cache_dir = "/var/cache/thumbs"
        "#;

        let config = LoaderConfig::from_toml_str(toml_content).expect("Failed to parse config");

        assert_eq!(config.worker_count, 2);
        assert_eq!(config.collapse_tag.as_deref(), Some("banner"));
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.effective_cache_dir(), PathBuf::from("/var/cache/thumbs"));
        // untouched fields keep their defaults
        assert_eq!(config.read_timeout_secs, 30);
        assert_eq!(config.memory_cache_entries, DEFAULT_CACHE_ENTRIES);
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = LoaderConfig::from_toml_str("").unwrap();
        assert_eq!(config.worker_count, LoaderConfig::default().worker_count);
        assert_eq!(config.user_agent, LoaderConfig::default().user_agent);
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warn.to_string(), "warn");
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
