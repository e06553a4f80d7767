//! Thumbloader - asynchronous remote image loading.
//!
//! Images are resolved through three tiers (memory, disk, network), decoded
//! with power-of-two downsampling, and delivered to consumers on the context
//! that owns them. Consumers reused for a different image never receive the
//! stale result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the dispatch registry.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing adapters for external services.
pub mod infrastructure;

#[cfg(test)]
mod test_support;

/// Current version of the library.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = "thumbloader";

/// Qualifier used to resolve platform directories.
pub const APP_QUALIFIER: &str = "com";

/// Organization used to resolve platform directories.
pub const APP_ORGANIZATION: &str = "linuxmobile";

pub use application::DispatchRegistry;
pub use domain::{
    ConsumerHandle, ConsumerId, DecodedImage, DisplayPort, FetchSource, ImageCachePort,
    ImageDecoder, LoadError, LoadResult, ResourceKey,
};
pub use infrastructure::{
    CacheStats, ConfigStore, DeliveryDispatcher, DiskImageCache, HttpFetcher, ImageLoader,
    LoaderConfig, MemoryImageCache, RequestOutcome, SampledDecoder,
};
