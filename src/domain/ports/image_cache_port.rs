//! Port definition for decoded image caching.

use std::sync::Arc;

use crate::domain::entities::{DecodedImage, ResourceKey};

/// Port for in-memory image caching.
///
/// Implementations must be thread-safe and must not block for longer than a
/// map operation: `get` runs on the consumer context.
pub trait ImageCachePort: Send + Sync {
    /// Attempts to get an image from the cache.
    /// Returns None if not cached.
    fn get(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>>;

    /// Stores an image in the cache.
    fn put(&self, key: ResourceKey, image: Arc<DecodedImage>);

    /// Removes an image from the cache.
    fn evict(&self, key: &ResourceKey);

    /// Returns the current number of cached images.
    fn len(&self) -> usize;

    /// Returns true if the cache is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clears all images from the cache.
    fn clear(&self);
}
