//! Loader configuration.

pub mod loader_config;
pub mod storage;

pub use loader_config::{LoaderConfig, LogLevel};
pub use storage::{ConfigError, ConfigStore};
