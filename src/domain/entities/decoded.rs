//! Domain types for decoded images and load tasks.

use std::sync::Arc;

use super::{ConsumerHandle, ResourceKey, WeakConsumer};

/// A decoded, possibly downsampled pixel buffer.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: image::DynamicImage,
    sample_size: u32,
    source_width: u32,
    source_height: u32,
}

impl DecodedImage {
    /// Wraps decoded pixels together with how they were produced.
    #[must_use]
    pub const fn new(
        pixels: image::DynamicImage,
        sample_size: u32,
        source_width: u32,
        source_height: u32,
    ) -> Self {
        Self {
            pixels,
            sample_size,
            source_width,
            source_height,
        }
    }

    /// Wraps pixels that were not downsampled.
    #[must_use]
    pub fn full_size(pixels: image::DynamicImage) -> Self {
        let (w, h) = (pixels.width(), pixels.height());
        Self::new(pixels, 1, w, h)
    }

    /// Returns the pixel buffer.
    #[must_use]
    pub const fn pixels(&self) -> &image::DynamicImage {
        &self.pixels
    }

    /// Width of the decoded buffer.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height of the decoded buffer.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Power-of-two factor the source was reduced by.
    #[must_use]
    pub const fn sample_size(&self) -> u32 {
        self.sample_size
    }

    /// Dimensions reported by the probe pass.
    #[must_use]
    pub const fn source_dimensions(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    /// Approximate heap footprint of the pixel buffer.
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.pixels.as_bytes().len()
    }
}

/// Where an image was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    /// In-memory LRU cache.
    MemoryCache,
    /// Disk cache.
    DiskCache,
    /// Downloaded from the network.
    Network,
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryCache => write!(f, "memory"),
            Self::DiskCache => write!(f, "disk"),
            Self::Network => write!(f, "network"),
        }
    }
}

/// One queued unit of work: load `key` for `consumer`.
///
/// The task holds the consumer weakly. A consumer dropped while its task is
/// queued simply never receives anything.
#[derive(Debug, Clone)]
pub struct LoadTask {
    /// Image to resolve.
    pub key: ResourceKey,
    /// Target expecting the image.
    pub consumer: WeakConsumer,
    /// Loading indicator to hide once the task completes.
    pub placeholder: Option<ConsumerHandle>,
}

impl LoadTask {
    /// Creates a task for `consumer`.
    #[must_use]
    pub fn new(
        key: ResourceKey,
        consumer: &ConsumerHandle,
        placeholder: Option<ConsumerHandle>,
    ) -> Self {
        Self {
            key,
            consumer: consumer.downgrade(),
            placeholder,
        }
    }
}

/// Result of a finished task, posted to the consumer context.
///
/// `image` is `None` when nothing could be loaded.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// The task that produced this result.
    pub task: LoadTask,
    /// The decoded image, or `None` on failure.
    pub image: Option<Arc<DecodedImage>>,
}
