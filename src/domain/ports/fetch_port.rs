//! Port for retrieving raw image bytes from their origin.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::domain::entities::ResourceKey;
use crate::domain::errors::LoadError;

/// Body of a fetched resource, yielded chunk by chunk.
pub type ByteStream = BoxStream<'static, Result<Bytes, LoadError>>;

/// Port for opening a remote resource.
///
/// Implementations own their timeout and redirect policy. Every failure is
/// reported as [`LoadError::SourceUnavailable`].
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Opens `key` and returns its body as a stream.
    async fn open(&self, key: &ResourceKey) -> Result<ByteStream, LoadError>;
}

#[cfg(test)]
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use futures_util::StreamExt;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Canned answer for one URL.
    #[derive(Debug, Clone)]
    pub enum MockResponse {
        /// Body delivered in two chunks.
        Body(Vec<u8>),
        /// Connection refused before any byte.
        Fail(String),
        /// First chunk delivered, then the stream breaks.
        Truncated(Vec<u8>),
    }

    /// Mock fetch source serving canned bodies.
    #[derive(Default)]
    pub struct MockFetchSource {
        responses: parking_lot::Mutex<HashMap<String, MockResponse>>,
        gates: parking_lot::Mutex<HashMap<String, Arc<Notify>>>,
        calls: parking_lot::Mutex<HashMap<String, usize>>,
        total: AtomicUsize,
    }

    impl MockFetchSource {
        /// Creates new mock with no responses.
        pub fn new() -> Self {
            Self::default()
        }

        /// Serves `body` for `url`.
        pub fn respond(&self, url: &str, body: Vec<u8>) {
            self.responses
                .lock()
                .insert(url.to_string(), MockResponse::Body(body));
        }

        /// Sets an arbitrary response for `url`.
        pub fn set(&self, url: &str, response: MockResponse) {
            self.responses.lock().insert(url.to_string(), response);
        }

        /// Holds every open of `url` until the returned gate is notified.
        pub fn hold(&self, url: &str) -> Arc<Notify> {
            let gate = Arc::new(Notify::new());
            self.gates.lock().insert(url.to_string(), gate.clone());
            gate
        }

        /// Number of opens of `url`.
        pub fn calls_for(&self, url: &str) -> usize {
            self.calls.lock().get(url).copied().unwrap_or(0)
        }

        /// Number of opens across all URLs.
        pub fn total_calls(&self) -> usize {
            self.total.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl FetchSource for MockFetchSource {
        async fn open(&self, key: &ResourceKey) -> Result<ByteStream, LoadError> {
            let url = key.as_str().to_string();
            *self.calls.lock().entry(url.clone()).or_default() += 1;
            self.total.fetch_add(1, Ordering::SeqCst);

            let gate = self.gates.lock().get(&url).cloned();
            if let Some(gate) = gate {
                gate.notified().await;
            }

            let response = self.responses.lock().get(&url).cloned();
            match response {
                Some(MockResponse::Body(body)) => {
                    let mid = body.len() / 2;
                    let chunks = vec![
                        Ok(Bytes::copy_from_slice(&body[..mid])),
                        Ok(Bytes::copy_from_slice(&body[mid..])),
                    ];
                    Ok(futures_util::stream::iter(chunks).boxed())
                }
                Some(MockResponse::Truncated(body)) => {
                    let chunks = vec![
                        Ok(Bytes::from(body)),
                        Err(LoadError::source_unavailable("connection reset")),
                    ];
                    Ok(futures_util::stream::iter(chunks).boxed())
                }
                Some(MockResponse::Fail(message)) => Err(LoadError::source_unavailable(message)),
                None => Err(LoadError::source_unavailable("HTTP 404 Not Found")),
            }
        }
    }
}
