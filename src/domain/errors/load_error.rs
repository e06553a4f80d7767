//! Image pipeline error types.

use thiserror::Error;

/// Result type for pipeline operations.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

/// Errors raised inside the load pipeline.
///
/// None of these reach a consumer: the loader degrades every variant to a
/// missing image.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum LoadError {
    #[error("source unavailable: {message}")]
    SourceUnavailable { message: String },

    #[error("disk cache write failed: {message}")]
    Storage { message: String },

    #[error("decode failed: {message}")]
    DecodeFailure { message: String },

    #[error("resource exhausted: {message}")]
    ResourceExhaustion { message: String },

    #[error("loader setup failed: {message}")]
    Setup { message: String },
}

impl LoadError {
    /// Creates source unavailable error.
    #[must_use]
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
        }
    }

    /// Creates storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates decode failure error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::DecodeFailure {
            message: message.into(),
        }
    }

    /// Creates resource exhaustion error.
    #[must_use]
    pub fn exhausted(message: impl Into<String>) -> Self {
        Self::ResourceExhaustion {
            message: message.into(),
        }
    }

    /// Creates setup error.
    #[must_use]
    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }

    /// Returns whether the memory cache must be dropped in response.
    #[must_use]
    pub const fn is_resource_exhaustion(&self) -> bool {
        matches!(self, Self::ResourceExhaustion { .. })
    }

    /// Returns whether the error came from fetching or storing bytes.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(self, Self::SourceUnavailable { .. } | Self::Storage { .. })
    }
}

impl From<image::ImageError> for LoadError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::Limits(e) => Self::exhausted(e.to_string()),
            other => Self::decode(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::error::{LimitError, LimitErrorKind};

    #[test]
    fn test_limit_errors_map_to_exhaustion() {
        let err: LoadError = image::ImageError::Limits(LimitError::from_kind(
            LimitErrorKind::InsufficientMemory,
        ))
        .into();
        assert!(err.is_resource_exhaustion());
        assert!(!err.is_source_error());
    }

    #[test]
    fn test_source_classification() {
        assert!(LoadError::source_unavailable("timeout").is_source_error());
        assert!(LoadError::storage("disk full").is_source_error());
        assert!(!LoadError::decode("bad header").is_source_error());
    }

    #[test]
    fn test_display() {
        let err = LoadError::source_unavailable("HTTP 404 Not Found");
        assert_eq!(err.to_string(), "source unavailable: HTTP 404 Not Found");
    }
}
