//! Disk-based image cache for persistence across sessions.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use futures_util::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

use crate::domain::entities::ResourceKey;
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::ByteStream;

/// Maximum disk cache size in bytes (200 MB default).
pub const DEFAULT_MAX_CACHE_SIZE: u64 = 200 * 1024 * 1024;

const ENTRY_EXTENSION: &str = "img";
const PARTIAL_EXTENSION: &str = "part";

/// Disk-based image cache that persists raw image bytes, one file per key.
pub struct DiskImageCache {
    cache_dir: PathBuf,
    max_size: u64,
    current_size: AtomicU64,
    item_count: AtomicUsize,
}

impl DiskImageCache {
    /// Creates a new disk cache in the specified directory.
    ///
    /// Leftover partial downloads from an earlier run are removed.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created or read.
    pub async fn new(cache_dir: PathBuf, max_size: u64) -> LoadResult<Self> {
        fs::create_dir_all(&cache_dir)
            .await
            .map_err(|e| LoadError::setup(format!("Failed to create cache dir: {e}")))?;
        let mut total_size = 0u64;
        let mut count = 0usize;

        let mut entries = fs::read_dir(&cache_dir)
            .await
            .map_err(|e| LoadError::setup(format!("Failed to read cache dir: {e}")))?;

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if has_extension(&path, PARTIAL_EXTENSION) {
                if let Err(e) = fs::remove_file(&path).await {
                    warn!(path = %path.display(), error = %e, "Failed to remove partial download");
                }
            } else if has_extension(&path, ENTRY_EXTENSION)
                && let Ok(meta) = entry.metadata().await
            {
                total_size += meta.len();
                count += 1;
            }
        }

        let cache = Self {
            cache_dir,
            max_size,
            current_size: AtomicU64::new(total_size),
            item_count: AtomicUsize::new(count),
        };

        cache.cleanup_if_needed(None).await;

        Ok(cache)
    }

    /// Creates a cache in the default location (platform cache dir + `images`).
    ///
    /// # Errors
    /// Returns error if cache directory cannot be created.
    pub async fn default_location() -> LoadResult<Self> {
        Self::new(default_cache_dir(), DEFAULT_MAX_CACHE_SIZE).await
    }

    /// Returns the directory holding the cache files.
    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the stable location for `key`.
    #[must_use]
    pub fn location_for(&self, key: &ResourceKey) -> PathBuf {
        self.cache_dir
            .join(format!("{}.{ENTRY_EXTENSION}", key.cache_stem()))
    }

    /// Reads the cached bytes for `key`.
    ///
    /// A missing or unreadable file is a miss, never an error.
    pub async fn read(&self, key: &ResourceKey) -> Option<Vec<u8>> {
        let path = self.location_for(key);
        match fs::read(&path).await {
            Ok(bytes) => {
                trace!(key = %key, path = %path.display(), "Disk cache hit");
                Some(bytes)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                trace!(key = %key, "Disk cache miss");
                None
            }
            Err(e) => {
                debug!(key = %key, error = %e, "Unreadable disk cache entry, treating as miss");
                None
            }
        }
    }

    /// Streams `body` into the location for `key`.
    ///
    /// The bytes land in a uniquely named partial file first and are renamed
    /// into place only once complete, so a failed or concurrent download never
    /// leaves a truncated entry behind. Returns the complete body, so callers
    /// never depend on the entry surviving a concurrent cleanup.
    ///
    /// # Errors
    /// Returns the stream's error, or [`LoadError::Storage`] if the file
    /// cannot be written.
    pub async fn store_stream(&self, key: &ResourceKey, mut body: ByteStream) -> LoadResult<Vec<u8>> {
        let path = self.location_for(key);
        let partial = self.cache_dir.join(format!(
            "{}.{}.{PARTIAL_EXTENSION}",
            key.cache_stem(),
            uuid::Uuid::new_v4().simple()
        ));

        let written = async {
            let mut file = fs::File::create(&partial)
                .await
                .map_err(|e| LoadError::storage(format!("Failed to create cache file: {e}")))?;
            let mut written = Vec::new();
            while let Some(chunk) = body.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)
                    .await
                    .map_err(|e| LoadError::storage(format!("Failed to write cache file: {e}")))?;
                written.extend_from_slice(&chunk);
            }
            file.flush()
                .await
                .map_err(|e| LoadError::storage(format!("Failed to flush cache file: {e}")))?;
            file.sync_all()
                .await
                .map_err(|e| LoadError::storage(format!("Failed to sync cache file: {e}")))?;
            Ok::<_, LoadError>(written)
        }
        .await;

        let written = match written {
            Ok(written) => written,
            Err(e) => {
                let _ = fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        let old_size = fs::metadata(&path).await.map(|m| m.len()).ok();
        if let Err(e) = fs::rename(&partial, &path).await {
            let _ = fs::remove_file(&partial).await;
            return Err(LoadError::storage(format!(
                "Failed to move cache file into place: {e}"
            )));
        }

        let size = written.len() as u64;
        self.account_replaced(old_size, size);
        debug!(key = %key, path = %path.display(), size, "Stored image in disk cache");

        self.cleanup_if_needed(Some(&path)).await;

        Ok(written)
    }

    /// Stores an in-memory body for `key`.
    ///
    /// # Errors
    /// Returns [`LoadError::Storage`] if the file cannot be written.
    pub async fn store_bytes(&self, key: &ResourceKey, bytes: &[u8]) -> LoadResult<u64> {
        let chunk = bytes::Bytes::copy_from_slice(bytes);
        let body = futures_util::stream::once(async move { Ok::<_, LoadError>(chunk) });
        let stored = self.store_stream(key, body.boxed()).await?;
        Ok(stored.len() as u64)
    }

    /// Lowers the counters, saturating at zero. A `clear` racing a store may
    /// already have reset them.
    fn shrink(&self, size: u64, count: usize) {
        let _ = self
            .current_size
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(size))
            });
        let _ = self
            .item_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
                Some(v.saturating_sub(count))
            });
    }

    fn account_replaced(&self, old_size: Option<u64>, new_size: u64) {
        if let Some(old) = old_size {
            if new_size > old {
                self.current_size
                    .fetch_add(new_size - old, Ordering::Relaxed);
            } else {
                self.shrink(old - new_size, 0);
            }
        } else {
            self.current_size.fetch_add(new_size, Ordering::Relaxed);
            self.item_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes an image from disk cache.
    pub async fn evict(&self, key: &ResourceKey) {
        let path = self.location_for(key);
        let size = fs::metadata(&path).await.map(|m| m.len()).ok();
        if let Err(e) = fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(key = %key, error = %e, "Failed to evict from disk cache");
            }
        } else if let Some(s) = size {
            self.shrink(s, 1);
            debug!(key = %key, "Evicted from disk cache");
        }
    }

    /// Clears the entire disk cache.
    ///
    /// # Errors
    /// Returns error if cache directory cannot be read.
    pub async fn clear(&self) -> LoadResult<()> {
        let mut entries = fs::read_dir(&self.cache_dir)
            .await
            .map_err(|e| LoadError::storage(format!("Failed to read cache dir: {e}")))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LoadError::storage(format!("Failed to read entry: {e}")))?
        {
            let path = entry.path();
            if has_extension(&path, ENTRY_EXTENSION) && fs::remove_file(&path).await.is_err() {
                warn!(path = %path.display(), "Failed to remove cache file");
            }
        }
        self.current_size.store(0, Ordering::Relaxed);
        self.item_count.store(0, Ordering::Relaxed);
        debug!("Cleared disk cache");
        Ok(())
    }

    /// Returns the current cache size in bytes.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.current_size.load(Ordering::Relaxed)
    }

    /// Returns the number of cached files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.item_count.load(Ordering::Relaxed)
    }

    /// Returns true if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks if an image is cached.
    pub async fn contains(&self, key: &ResourceKey) -> bool {
        fs::try_exists(self.location_for(key))
            .await
            .unwrap_or(false)
    }

    /// Removes the oldest entries if over the size limit, never `keep`.
    async fn cleanup_if_needed(&self, keep: Option<&Path>) {
        let current_size = self.current_size();
        if current_size <= self.max_size {
            return;
        }

        debug!(
            current_size = current_size,
            max_size = self.max_size,
            "Disk cache over limit, cleaning up"
        );

        let Ok(mut entries) = fs::read_dir(&self.cache_dir).await else {
            return;
        };

        let mut files: Vec<(PathBuf, std::time::SystemTime, u64)> = Vec::new();

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !has_extension(&path, ENTRY_EXTENSION) || keep == Some(path.as_path()) {
                continue;
            }

            if let Ok(meta) = entry.metadata().await {
                let touched = meta
                    .accessed()
                    .or_else(|_| meta.modified())
                    .unwrap_or(std::time::SystemTime::UNIX_EPOCH);
                files.push((path, touched, meta.len()));
            }
        }

        files.sort_by_key(|(_, time, _)| *time);

        let mut freed_size = 0u64;
        let mut freed_count = 0usize;
        let target = current_size - self.max_size + (self.max_size / 10);

        for (path, _, size) in files {
            if freed_size >= target {
                break;
            }

            if let Err(e) = fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %e, "Failed to remove old cache file");
            } else {
                trace!(path = %path.display(), "Removed old cache file");
                freed_size += size;
                freed_count += 1;
            }
        }
        self.shrink(freed_size, freed_count);

        debug!(
            freed_size = freed_size,
            freed_count = freed_count,
            "Disk cache cleanup complete"
        );
    }
}

impl std::fmt::Debug for DiskImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskImageCache")
            .field("cache_dir", &self.cache_dir)
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension().is_some_and(|e| e == ext)
}

/// Returns the default cache directory path.
#[must_use]
pub fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from(
        crate::APP_QUALIFIER,
        crate::APP_ORGANIZATION,
        crate::NAME,
    )
    .map_or_else(
        || std::env::temp_dir().join(crate::NAME).join("images"),
        |dirs| dirs.cache_dir().join("images"),
    )
}
