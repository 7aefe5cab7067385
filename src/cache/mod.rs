//! Key/value cache with per-entry expiration.
//!
//! [`Cache`] is the seam the token provider talks to; [`MemoryCache`] is the
//! bundled in-process implementation.

use std::time::Duration;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Result;

pub mod memory_cache;

pub use memory_cache::MemoryCache;

/// Lifetime requested for an entry on `set`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiration {
    /// Use the cache's default window.
    Default,
    /// Keep until deleted.
    Never,
    After(Duration),
}

impl From<Duration> for Expiration {
    /// A zero duration means "use the default window".
    fn from(ttl: Duration) -> Self {
        if ttl.is_zero() {
            Expiration::Default
        } else {
            Expiration::After(ttl)
        }
    }
}

/// Every operation fails with the context error, doing nothing, when `ctx`
/// has already fired.
#[async_trait]
pub trait Cache: Send + Sync {
    async fn set(&self, ctx: &Context, key: &str, value: &str, ttl: Expiration) -> Result<()>;

    /// Returns [`crate::SdkError::NotFound`] when the key is absent or expired.
    async fn get(&self, ctx: &Context, key: &str) -> Result<String>;

    /// Removing an absent key is not an error.
    async fn delete(&self, ctx: &Context, key: &str) -> Result<()>;
}
