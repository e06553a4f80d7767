//! Tracing subscriber setup.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt};

use super::config::LoaderConfig;

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log file could not be opened.
    #[error("failed to open log file {path}: {source}")]
    Io {
        /// Log file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A global subscriber is already installed.
    #[error("failed to install subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Builds the level filter: `RUST_LOG` wins over the configured level.
#[must_use]
pub fn env_filter(config: &LoaderConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.to_string()))
}

/// Installs the global tracing subscriber described by `config`.
///
/// Logs go to `config.log_path` when set, otherwise to stderr.
///
/// # Errors
/// Returns error if the log file cannot be opened or a subscriber is already
/// installed.
pub fn init(config: &LoaderConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config);

    if let Some(log_path) = &config.log_path {
        let file = open_log_file(log_path).map_err(|source| LoggingError::Io {
            path: log_path.clone(),
            source,
        })?;

        let file_layer = fmt::layer()
            .with_writer(file)
            .with_ansi(false)
            .with_target(true)
            .with_thread_ids(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .try_init()?;

        info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

fn open_log_file(path: &std::path::Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_log_file_creates_parent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("loader.log");

        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_unwritable_log_path_is_io_error() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let config = LoaderConfig {
            log_path: Some(blocker.join("loader.log")),
            ..LoaderConfig::default()
        };

        assert!(matches!(init(&config), Err(LoggingError::Io { .. })));
    }
}
