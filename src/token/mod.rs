//! Access-token retrieval backed by a cache and a remote fetcher.

use async_trait::async_trait;
use serde::Deserialize;

use crate::context::Context;
use crate::error::Result;

pub mod cached_provider;

pub use cached_provider::CachedTokenProvider;

/// A credential freshly issued by the remote authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedToken {
    pub value: String,
    /// lifetime in seconds; 0 falls back to the cache default window
    pub lease_seconds: u64,
}

impl FetchedToken {
    pub fn new(value: impl Into<String>, lease_seconds: u64) -> Self {
        Self {
            value: value.into(),
            lease_seconds,
        }
    }
}

/// Retrieves credentials from the remote authority.
#[async_trait]
pub trait TokenFetcher: Send + Sync {
    async fn fetch_token(&self, ctx: &Context) -> Result<FetchedToken>;

    /// Cache key for the credential this fetcher produces. Pure and
    /// deterministic, performs no I/O.
    fn cache_key(&self) -> String;
}

#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Cached token if present, otherwise a freshly fetched one.
    async fn access_token(&self, ctx: &Context) -> Result<String>;

    /// Fetch a new token regardless of cache state and overwrite the cache.
    async fn refresh_access_token(&self, ctx: &Context) -> Result<String>;
}

/// How concurrent cache misses are handled by [`CachedTokenProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissPolicy {
    /// Misses run under the shared lock: concurrent misses may each call
    /// the fetcher and each write the cache, last write wins.
    Shared,
    /// A miss takes the exclusive lock and re-checks the cache before
    /// fetching, so concurrent misses for the credential fetch once.
    #[default]
    SingleFlight,
}
