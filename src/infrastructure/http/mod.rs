//! HTTP transport for fetching image bytes.

pub mod fetcher;

pub use fetcher::HttpFetcher;
