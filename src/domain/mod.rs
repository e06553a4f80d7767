//! Domain layer with core entities and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;

pub use entities::{ConsumerHandle, ConsumerId, DecodedImage, ResourceKey};
pub use errors::{LoadError, LoadResult};
pub use ports::{DisplayPort, FetchSource, ImageCachePort, ImageDecoder};
