//! In-memory LRU cache for decoded images.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{DecodedImage, ResourceKey};
use crate::domain::ports::ImageCachePort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_CACHE_ENTRIES: usize = 100;

/// Default pixel budget of the memory cache (64 MB).
pub const DEFAULT_CACHE_BYTES: usize = 64 * 1024 * 1024;

struct Inner {
    entries: LruCache<ResourceKey, Arc<DecodedImage>>,
    bytes: usize,
}

impl Inner {
    fn remove(&mut self, key: &ResourceKey) -> bool {
        if let Some(old) = self.entries.pop(key) {
            self.bytes -= old.byte_size();
            true
        } else {
            false
        }
    }
}

/// In-memory LRU cache for decoded images.
///
/// Bounded both by entry count and by the total size of the pixel buffers.
/// Evicted images stay valid for whoever still holds an `Arc` to them.
pub struct MemoryImageCache {
    inner: Mutex<Inner>,
    max_bytes: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the specified bounds.
    #[must_use]
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let cap = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(cap),
                bytes: 0,
            }),
            max_bytes,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default bounds.
    #[must_use]
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CACHE_ENTRIES, DEFAULT_CACHE_BYTES)
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let inner = self.inner.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: inner.entries.len(),
            bytes: inner.bytes,
        }
    }

    /// Peeks at an image without promoting it in the LRU.
    pub fn peek(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>> {
        self.inner.lock().entries.peek(key).cloned()
    }

    /// Returns true if `key` is cached.
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.inner.lock().entries.contains(key)
    }

    /// Total size of the cached pixel buffers.
    pub fn current_bytes(&self) -> usize {
        self.inner.lock().bytes
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current size of the cached pixel buffers.
    pub bytes: usize,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {} images ({} bytes), {:.1}% hit rate ({} hits, {} misses)",
            self.size, self.bytes, self.hit_rate, self.hits, self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>> {
        let mut inner = self.inner.lock();
        if let Some(img) = inner.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(img.clone())
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    fn put(&self, key: ResourceKey, image: Arc<DecodedImage>) {
        let size = image.byte_size();
        if size > self.max_bytes {
            debug!(key = %key, size, "Image larger than memory budget, not cached");
            self.evict(&key);
            return;
        }

        let mut inner = self.inner.lock();
        inner.remove(&key);
        while inner.bytes + size > self.max_bytes {
            match inner.entries.pop_lru() {
                Some((_, old)) => inner.bytes -= old.byte_size(),
                None => break,
            }
        }
        if let Some((_, old)) = inner.entries.push(key.clone(), image) {
            inner.bytes -= old.byte_size();
        }
        inner.bytes += size;
        debug!(key = %key, size, total = inner.bytes, "Stored image in memory cache");
    }

    fn evict(&self, key: &ResourceKey) {
        if self.inner.lock().remove(key) {
            debug!(key = %key, "Evicted image from memory cache");
        }
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.bytes = 0;
        debug!("Cleared memory image cache");
    }
}
