//! Two-pass image decoding with power-of-two downsampling.
//!
//! The first pass reads only the header to learn the source dimensions. The
//! second pass decodes the pixels and reduces them by the largest power of
//! two that keeps both sides at or above the target size.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{ImageReader, Limits};
use tracing::trace;

use crate::domain::entities::DecodedImage;
use crate::domain::errors::LoadError;
use crate::domain::ports::ImageDecoder;

/// Smallest side, in pixels, a downsampled image keeps.
pub const DEFAULT_TARGET_SIZE: u32 = 70;

/// Largest allocation a single decode may make (256 MB).
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 256 * 1024 * 1024;

/// Returns the largest power of two `f` with `width / f >= target` and
/// `height / f >= target`, or 1 if the image is already at or below target.
#[must_use]
pub fn sample_size(width: u32, height: u32, target: u32) -> u32 {
    let target = target.max(1);
    let (mut w, mut h) = (width, height);
    let mut scale = 1;
    while w / 2 >= target && h / 2 >= target {
        w /= 2;
        h /= 2;
        scale *= 2;
    }
    scale
}

/// Decoder backed by the `image` crate.
#[derive(Debug, Clone)]
pub struct SampledDecoder {
    target_size: u32,
    max_alloc: u64,
}

impl SampledDecoder {
    #[must_use]
    pub const fn new(target_size: u32, max_alloc: u64) -> Self {
        Self {
            target_size,
            max_alloc,
        }
    }

    /// Reads the dimensions without decoding any pixels.
    ///
    /// # Errors
    /// Returns [`LoadError::DecodeFailure`] if the format is not recognised.
    pub fn probe(bytes: &[u8]) -> Result<(u32, u32), LoadError> {
        Ok(Self::reader(bytes)?.into_dimensions()?)
    }

    fn reader(bytes: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, LoadError> {
        let reader = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| LoadError::decode(format!("Failed to read header: {e}")))?;
        if reader.format().is_none() {
            return Err(LoadError::decode("unrecognised image format"));
        }
        Ok(reader)
    }
}

impl Default for SampledDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_SIZE, DEFAULT_MAX_DECODE_BYTES)
    }
}

impl ImageDecoder for SampledDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError> {
        let (width, height) = Self::probe(bytes)?;
        let factor = sample_size(width, height, self.target_size);

        let mut limits = Limits::default();
        limits.max_alloc = Some(self.max_alloc);
        let mut reader = Self::reader(bytes)?;
        reader.limits(limits);
        let pixels = reader.decode()?;

        let pixels = if factor > 1 {
            pixels.resize_exact(
                (width / factor).max(1),
                (height / factor).max(1),
                FilterType::Nearest,
            )
        } else {
            pixels
        };

        trace!(width, height, factor, "Decoded image");
        Ok(DecodedImage::new(pixels, factor, width, height))
    }
}
