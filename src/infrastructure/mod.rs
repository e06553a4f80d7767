//! Infrastructure layer with adapters for the network, disk and decoding.

/// Loader configuration.
pub mod config;
/// HTTP fetch source.
pub mod http;
/// Image handling (caching, decoding, loading).
pub mod image;
/// Tracing subscriber setup.
pub mod logging;

pub use config::{ConfigError, ConfigStore, LoaderConfig, LogLevel};
pub use http::HttpFetcher;
pub use image::{
    CacheStats, DeliveryDispatcher, DiskImageCache, ImageLoader, MemoryImageCache, RequestOutcome,
    SampledDecoder,
};
