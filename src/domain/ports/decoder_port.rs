//! Port for turning raw bytes into pixels.

use crate::domain::entities::DecodedImage;
use crate::domain::errors::LoadError;

/// Port for image decoding.
///
/// Decoding is CPU-bound and runs on the blocking pool.
#[cfg_attr(test, mockall::automock)]
pub trait ImageDecoder: Send + Sync {
    /// Decodes `bytes`, downsampling toward the decoder's target size.
    ///
    /// # Errors
    /// Returns [`LoadError::DecodeFailure`] for data that is not an image and
    /// [`LoadError::ResourceExhaustion`] when decoding would exceed memory
    /// limits.
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, LoadError>;
}
