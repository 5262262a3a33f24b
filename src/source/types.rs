//! Source types and traits.

use std::future::Future;
use thiserror::Error;

/// Errors from a single sprite source attempt.
///
/// These are recovered locally by trying the next source in priority order;
/// they never propagate past the resolver.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SourceError {
    /// HTTP request failed or returned a non-success status
    #[error("HTTP error: {0}")]
    Http(String),

    /// Response body did not decode as a well-formed image
    #[error("invalid image payload: {0}")]
    InvalidImage(String),
}

/// Trait for fetching sprite bytes over HTTP.
///
/// This abstraction allows dependency injection: tests substitute a scripted
/// fetcher so resolver and store behavior can be exercised without network
/// access.
pub trait SpriteFetch: Send + Sync {
    /// Performs an HTTP GET request for the given URL.
    ///
    /// # Returns
    ///
    /// The response body as bytes, or an error if the request failed or the
    /// server returned a non-success status.
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, SourceError>> + Send;
}
