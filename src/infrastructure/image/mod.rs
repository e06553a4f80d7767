//! Image handling infrastructure.
//!
//! This module provides:
//! - Memory caching with LRU and byte budget eviction
//! - Disk caching of the raw downloaded bytes
//! - Two-pass decoding with power-of-two downsampling
//! - Async image loading pipeline and consumer-side delivery

pub mod decoder;
pub mod dispatcher;
pub mod disk_cache;
pub mod loader;
pub mod memory_cache;

pub use decoder::{SampledDecoder, sample_size};
pub use dispatcher::DeliveryDispatcher;
pub use disk_cache::DiskImageCache;
pub use loader::{ImageLoader, RequestOutcome};
pub use memory_cache::{CacheStats, MemoryImageCache};
