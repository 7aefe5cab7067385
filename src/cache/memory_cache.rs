use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cache::{Cache, Expiration};
use crate::config::settings::CacheSettings;
use crate::context::Context;
use crate::error::{Result, SdkError};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    /// `None` never expires
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

#[derive(Debug)]
struct Store {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_expiration: Option<Duration>,
}

impl Store {
    async fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let mut map = self.entries.write().await;
        let before = map.len();
        map.retain(|_, entry| !entry.is_expired(now));
        before - map.len()
    }
}

/// In-process cache shared between clones.
///
/// Expired entries are hidden from `get` immediately and physically removed
/// by `delete_expired`, either on demand or by the janitor task.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    inner: Arc<Store>,
}

impl MemoryCache {
    /// `default_expiration` of zero keeps default entries forever.
    /// A non-zero `cleanup_interval` starts a janitor on the current tokio
    /// runtime that sweeps expired entries until the last clone is dropped.
    pub fn new(default_expiration: Duration, cleanup_interval: Duration) -> Self {
        let inner = Arc::new(Store {
            entries: RwLock::new(HashMap::new()),
            default_expiration: (!default_expiration.is_zero()).then_some(default_expiration),
        });
        if !cleanup_interval.is_zero() {
            spawn_janitor(Arc::downgrade(&inner), cleanup_interval);
        }
        Self { inner }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(
            Duration::from_secs(settings.default_expiration_seconds),
            Duration::from_secs(settings.cleanup_interval_seconds),
        )
    }

    /// A window too large to represent as an instant never expires.
    fn expires_at(&self, ttl: Expiration) -> Option<Instant> {
        let window = match ttl {
            Expiration::Never => return None,
            Expiration::After(ttl) => ttl,
            Expiration::Default => self.inner.default_expiration?,
        };
        Instant::now().checked_add(window)
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn delete_expired(&self) -> usize {
        self.inner.delete_expired().await
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub async fn item_count(&self) -> usize {
        self.inner.entries.read().await.len()
    }

    pub async fn flush(&self) {
        self.inner.entries.write().await.clear();
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, ctx: &Context, key: &str, value: &str, ttl: Expiration) -> Result<()> {
        ctx.check()?;
        let entry = CacheEntry {
            value: value.to_owned(),
            expires_at: self.expires_at(ttl),
        };
        self.inner.entries.write().await.insert(key.to_owned(), entry);
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<String> {
        ctx.check()?;
        let map = self.inner.entries.read().await;
        map.get(key)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.value.clone())
            .ok_or_else(|| SdkError::NotFound(key.to_owned()))
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        ctx.check()?;
        self.inner.entries.write().await.remove(key);
        Ok(())
    }
}

fn spawn_janitor(store: Weak<Store>, interval: Duration) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        warn!("no tokio runtime, expired cache entries are only swept on demand");
        return;
    };
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(store) = store.upgrade() else {
                debug!("cache dropped, janitor stopping");
                break;
            };
            let removed = store.delete_expired().await;
            if removed > 0 {
                debug!("janitor removed {} expired cache entries", removed);
            }
        }
    });
}
