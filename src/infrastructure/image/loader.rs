//! Async image loading orchestrator.
//!
//! Implements a three-tier lookup: Memory -> Disk -> Network. Requests that
//! miss the memory cache are queued for a fixed number of concurrent
//! workers; results travel back to the consumer context through the
//! [`DeliveryDispatcher`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, error, info, trace, warn};

use crate::application::DispatchRegistry;
use crate::domain::entities::{
    ConsumerHandle, DecodedImage, Delivery, ImageSource, LoadTask, ResourceKey,
};
use crate::domain::errors::{LoadError, LoadResult};
use crate::domain::ports::{DisplayPort, FetchSource, ImageCachePort, ImageDecoder};
use crate::infrastructure::config::LoaderConfig;
use crate::infrastructure::http::HttpFetcher;

use super::decoder::SampledDecoder;
use super::dispatcher::DeliveryDispatcher;
use super::disk_cache::DiskImageCache;
use super::memory_cache::{CacheStats, MemoryImageCache};

/// What `ImageLoader::request` did with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Served from memory before returning.
    Delivered,
    /// Queued for the worker pool.
    Queued,
}

#[derive(Debug)]
enum Job {
    /// Resolve and deliver to a consumer.
    Deliver(LoadTask),
    /// Resolve into the caches only.
    Warm(ResourceKey),
}

/// Orchestrates image loading from memory, disk, and network.
pub struct ImageLoader {
    memory_cache: Arc<MemoryImageCache>,
    disk_cache: Arc<DiskImageCache>,
    registry: Arc<DispatchRegistry>,
    display: Arc<dyn DisplayPort>,
    pending: Arc<AtomicUsize>,
    job_tx: mpsc::UnboundedSender<Job>,
    config: LoaderConfig,
}

impl std::fmt::Debug for ImageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageLoader")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Releases one pending slot when a job ends, including by panic.
struct PendingGuard(Arc<AtomicUsize>);

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// State for the background worker loop.
struct WorkerState {
    worker: Arc<LoadWorker>,
    pending: Arc<AtomicUsize>,
    semaphore: Arc<Semaphore>,
    job_rx: mpsc::UnboundedReceiver<Job>,
}

impl ImageLoader {
    /// Creates a loader and the dispatcher that delivers its results.
    ///
    /// Must be called inside a tokio runtime: the worker loop is spawned
    /// immediately.
    pub fn new(
        config: LoaderConfig,
        display: Arc<dyn DisplayPort>,
        disk_cache: Arc<DiskImageCache>,
        fetcher: Arc<dyn FetchSource>,
        decoder: Arc<dyn ImageDecoder>,
    ) -> (Self, DeliveryDispatcher) {
        let memory_cache = Arc::new(MemoryImageCache::new(
            config.memory_cache_entries,
            config.memory_cache_bytes,
        ));
        let registry = Arc::new(DispatchRegistry::new());

        let (job_tx, job_rx) = mpsc::unbounded_channel();
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let worker_state = WorkerState {
            worker: Arc::new(LoadWorker {
                memory_cache: memory_cache.clone(),
                disk_cache: disk_cache.clone(),
                registry: registry.clone(),
                fetcher,
                decoder,
                delivery_tx,
            }),
            pending: pending.clone(),
            semaphore: Arc::new(Semaphore::new(config.worker_count.max(1))),
            job_rx,
        };

        tokio::spawn(Self::run_worker_loop(worker_state));

        let dispatcher = DeliveryDispatcher::new(
            delivery_rx,
            registry.clone(),
            display.clone(),
            config.collapse_tag.clone(),
        );

        let loader = Self {
            memory_cache,
            disk_cache,
            registry,
            display,
            pending,
            job_tx,
            config,
        };
        (loader, dispatcher)
    }

    /// Creates a loader with the HTTP fetcher, the sampled decoder and a
    /// disk cache at the configured location.
    ///
    /// # Errors
    /// Returns error if disk cache or HTTP client cannot be created.
    pub async fn with_defaults(
        config: LoaderConfig,
        display: Arc<dyn DisplayPort>,
    ) -> LoadResult<(Self, DeliveryDispatcher)> {
        let disk_cache = Arc::new(
            DiskImageCache::new(config.effective_cache_dir(), config.disk_cache_bytes).await?,
        );
        let fetcher = Arc::new(HttpFetcher::new(&config)?);
        let decoder = Arc::new(SampledDecoder::new(
            config.target_size,
            config.max_decode_bytes,
        ));
        Ok(Self::new(config, display, disk_cache, fetcher, decoder))
    }

    /// Worker loop: queues jobs and runs at most `worker_count` at a time.
    async fn run_worker_loop(mut state: WorkerState) {
        let mut queue: VecDeque<Job> = VecDeque::new();

        loop {
            tokio::select! {
                job = state.job_rx.recv() => {
                    match job {
                        Some(job) => queue.push_back(job),
                        None => break,
                    }
                }
                Ok(permit) = state.semaphore.clone().acquire_owned(), if !queue.is_empty() => {
                    if let Some(job) = queue.pop_front() {
                        let worker = state.worker.clone();
                        let pending = PendingGuard(state.pending.clone());

                        tokio::spawn(async move {
                            let _pending = pending;
                            match job {
                                Job::Deliver(task) => {
                                    if let Some(delivery) = worker.resolve(task).await {
                                        let _ = worker.delivery_tx.send(delivery);
                                    }
                                }
                                Job::Warm(key) => {
                                    let _ = worker.load_image(&key).await;
                                }
                            }
                            drop(permit);
                        });
                    }
                }
            }
        }

        let dropped = queue.len();
        if dropped > 0 {
            state.pending.fetch_sub(dropped, Ordering::SeqCst);
            debug!(count = dropped, "Loader shut down, dropped queued loads");
        }
    }

    /// Binds `consumer` to `key` and starts showing it.
    ///
    /// Must be called from the consumer context. On a memory hit the image is
    /// shown before this returns and `placeholder` is hidden. On a miss the
    /// consumer shows its default image, `placeholder` is shown, and the load
    /// is queued; any earlier request for `consumer` is superseded.
    pub fn request(
        &self,
        key: impl Into<ResourceKey>,
        consumer: &ConsumerHandle,
        placeholder: Option<&ConsumerHandle>,
    ) -> RequestOutcome {
        let key = key.into();
        self.registry.register(consumer, key.clone());

        if let Some(image) = self.memory_cache.get(&key) {
            self.display.show_image(consumer, image);
            if let Some(placeholder) = placeholder {
                self.display.hide_placeholder(placeholder);
            }
            return RequestOutcome::Delivered;
        }

        self.display.show_default(consumer);
        if let Some(placeholder) = placeholder {
            self.display.show_placeholder(placeholder);
        }

        let task = LoadTask::new(key, consumer, placeholder.cloned());
        self.submit(Job::Deliver(task));
        RequestOutcome::Queued
    }

    /// Loads `key` into the caches without delivering it anywhere.
    pub fn prefetch(&self, key: impl Into<ResourceKey>) {
        let key = key.into();
        if self.memory_cache.contains(&key) {
            return;
        }
        self.submit(Job::Warm(key));
    }

    /// Prefetches multiple images into cache.
    pub fn prefetch_batch<I, K>(&self, keys: I)
    where
        I: IntoIterator<Item = K>,
        K: Into<ResourceKey>,
    {
        for key in keys {
            self.prefetch(key);
        }
    }

    fn submit(&self, job: Job) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.job_tx.send(job) {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!("Failed to queue image load: {}", e);
        }
    }

    /// Stops tracking `consumer`. Its pending loads will not be delivered.
    pub fn forget(&self, consumer: &ConsumerHandle) {
        if let Some(key) = self.registry.forget(consumer) {
            debug!(consumer = %consumer.id(), key = %key, "Forgot consumer");
        }
    }

    /// Drops registry entries of consumers that no longer exist.
    pub fn sweep_consumers(&self) -> usize {
        self.registry.sweep()
    }

    /// Returns the number of queued or running loads.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Returns memory cache statistics.
    #[must_use]
    pub fn memory_stats(&self) -> CacheStats {
        self.memory_cache.stats()
    }

    /// Returns the memory cache.
    #[must_use]
    pub const fn memory_cache(&self) -> &Arc<MemoryImageCache> {
        &self.memory_cache
    }

    /// Returns the disk cache.
    #[must_use]
    pub const fn disk_cache(&self) -> &Arc<DiskImageCache> {
        &self.disk_cache
    }

    /// Returns the loader configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Clears the memory cache.
    pub fn clear_memory(&self) {
        self.memory_cache.clear();
    }

    /// Clears all caches.
    pub async fn clear_all(&self) {
        self.memory_cache.clear();
        if let Err(e) = self.disk_cache.clear().await {
            warn!(error = %e, "Failed to clear disk cache");
        }
        info!("Cleared all image caches");
    }
}

/// Everything a running task needs, shared by all tasks.
struct LoadWorker {
    memory_cache: Arc<MemoryImageCache>,
    disk_cache: Arc<DiskImageCache>,
    registry: Arc<DispatchRegistry>,
    fetcher: Arc<dyn FetchSource>,
    decoder: Arc<dyn ImageDecoder>,
    delivery_tx: mpsc::UnboundedSender<Delivery>,
}

impl LoadWorker {
    /// Runs `task` to completion. Returns `None` if the task went stale.
    async fn resolve(&self, task: LoadTask) -> Option<Delivery> {
        if self.registry.is_reused(&task) {
            return None;
        }

        let image = self.load_image(&task.key).await;

        if self.registry.is_reused(&task) {
            return None;
        }
        Some(Delivery { task, image })
    }

    /// Resolves `key` and records the outcome in the memory cache.
    async fn load_image(&self, key: &ResourceKey) -> Option<Arc<DecodedImage>> {
        if let Some(image) = self.memory_cache.peek(key) {
            trace!(key = %key, source = %ImageSource::MemoryCache, "Image already loaded");
            return Some(image);
        }

        match self.fetch_and_decode(key).await {
            Ok((image, source)) => {
                let image = Arc::new(image);
                self.memory_cache.put(key.clone(), image.clone());
                debug!(key = %key, source = %source, "Image loaded successfully");
                Some(image)
            }
            Err(e) => {
                if e.is_resource_exhaustion() {
                    error!(key = %key, error = %e, "Out of memory while loading image, clearing memory cache");
                    self.memory_cache.clear();
                } else {
                    warn!(key = %key, error = %e, "Failed to load image");
                }
                self.memory_cache.evict(key);
                None
            }
        }
    }

    async fn fetch_and_decode(&self, key: &ResourceKey) -> LoadResult<(DecodedImage, ImageSource)> {
        if let Some(bytes) = self.disk_cache.read(key).await {
            match self.decode(bytes).await {
                Ok(image) => return Ok((image, ImageSource::DiskCache)),
                Err(e) if e.is_resource_exhaustion() => return Err(e),
                Err(e) => {
                    warn!(key = %key, error = %e, "Cached file is unusable, fetching again");
                    self.disk_cache.evict(key).await;
                }
            }
        }

        let body = self.fetcher.open(key).await?;
        let bytes = self.disk_cache.store_stream(key, body).await?;
        Ok((self.decode(bytes).await?, ImageSource::Network))
    }

    async fn decode(&self, bytes: Vec<u8>) -> LoadResult<DecodedImage> {
        let decoder = self.decoder.clone();
        tokio::task::spawn_blocking(move || decoder.decode(&bytes))
            .await
            .map_err(|e| LoadError::decode(format!("Decode task panicked: {e}")))?
    }
}
