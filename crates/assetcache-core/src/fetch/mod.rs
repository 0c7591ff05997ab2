//! Network fetch service.
//!
//! The worker only talks to the network through the `Fetcher` trait;
//! `HttpFetcher` is the reqwest-backed implementation used by the CLI.

pub mod client;
pub mod error;

use async_trait::async_trait;
use bytes::Bytes;
use url::Url;

pub use client::HttpFetcher;
pub use error::FetchError;

/// How a fetch may interact with intermediate HTTP caches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Default,
    /// Always go to the origin, ignoring any cached copy.
    Reload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: Url,
    pub cache_mode: CacheMode,
}

impl FetchRequest {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            cache_mode: CacheMode::Default,
        }
    }

    pub fn reload(url: Url) -> Self {
        Self {
            url,
            cache_mode: CacheMode::Reload,
        }
    }
}

/// A successful response, either fresh from the network or replayed from
/// the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl Response {
    pub fn ok(url: Url, body: impl Into<Bytes>) -> Self {
        Self {
            url,
            status: 200,
            content_type: None,
            body: body.into(),
        }
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync + 'static {
    /// Retrieve a resource. Non-success statuses are errors.
    async fn fetch(&self, request: &FetchRequest) -> Result<Response, FetchError>;
}
