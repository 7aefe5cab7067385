use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use crate::cache::{Cache, Expiration};
use crate::config::settings::TokenSettings;
use crate::context::Context;
use crate::error::Result;
use crate::observability::metrics::Metrics;
use crate::token::{MissPolicy, TokenFetcher, TokenProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lookup {
    First,
    Recheck,
}

/// Cache-first token provider.
///
/// `access_token` reads through the cache and fetches on a miss;
/// `refresh_access_token` always fetches. Fetch errors are returned as-is
/// and leave the cache untouched. A cache write failure after a successful
/// fetch is returned and the fetched token is dropped.
pub struct CachedTokenProvider {
    lock: RwLock<()>,
    cache: Arc<dyn Cache>,
    fetcher: Arc<dyn TokenFetcher>,
    miss_policy: MissPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl CachedTokenProvider {
    pub fn new(cache: Arc<dyn Cache>, fetcher: Arc<dyn TokenFetcher>) -> Self {
        Self {
            lock: RwLock::new(()),
            cache,
            fetcher,
            miss_policy: MissPolicy::default(),
            metrics: None,
        }
    }

    pub fn from_settings(
        cache: Arc<dyn Cache>,
        fetcher: Arc<dyn TokenFetcher>,
        settings: &TokenSettings,
    ) -> Self {
        Self::new(cache, fetcher).with_miss_policy(settings.miss_policy)
    }

    pub fn with_miss_policy(mut self, miss_policy: MissPolicy) -> Self {
        self.miss_policy = miss_policy;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn miss_policy(&self) -> MissPolicy {
        self.miss_policy
    }

    async fn read_lock(&self, ctx: &Context) -> Result<RwLockReadGuard<'_, ()>> {
        ctx.run(async { Ok(self.lock.read().await) }).await
    }

    async fn write_lock(&self, ctx: &Context) -> Result<RwLockWriteGuard<'_, ()>> {
        ctx.run(async { Ok(self.lock.write().await) }).await
    }

    /// `Ok(None)` on any miss; cancellation is the only cache error that
    /// is not treated as a miss. A recheck under the write lock does not
    /// count a second miss for the same call.
    async fn lookup(&self, ctx: &Context, key: &str, pass: Lookup) -> Result<Option<String>> {
        match self.cache.get(ctx, key).await {
            Ok(token) => {
                debug!("token cache hit for key '{}'", key);
                if let Some(metrics) = &self.metrics {
                    metrics.token_cache_hits.inc();
                }
                Ok(Some(token))
            }
            Err(err) if err.is_cancellation() => Err(err),
            Err(err) => {
                debug!("token cache miss for key '{}': {}", key, err);
                if let (Lookup::First, Some(metrics)) = (pass, &self.metrics) {
                    metrics.token_cache_misses.inc();
                }
                Ok(None)
            }
        }
    }

    async fn fetch_and_store(&self, ctx: &Context, key: &str) -> Result<String> {
        let fetched = match self.fetcher.fetch_token(ctx).await {
            Ok(fetched) => fetched,
            Err(err) => {
                warn!("token fetch for key '{}' failed: {}", key, err);
                self.record_fetch("error");
                return Err(err);
            }
        };
        self.record_fetch("success");

        let ttl = Expiration::from(Duration::from_secs(fetched.lease_seconds));
        self.cache
            .set(ctx, key, &fetched.value, ttl)
            .await
            .inspect_err(|err| warn!("storing token for key '{}' failed: {}", key, err))?;
        info!(
            "token for key '{}' fetched, lease {} seconds",
            key, fetched.lease_seconds
        );
        Ok(fetched.value)
    }

    fn record_fetch(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.token_fetches.with_label_values(&[outcome]).inc();
        }
    }
}

#[async_trait]
impl TokenProvider for CachedTokenProvider {
    async fn access_token(&self, ctx: &Context) -> Result<String> {
        let key = self.fetcher.cache_key();

        match self.miss_policy {
            MissPolicy::Shared => {
                let _guard = self.read_lock(ctx).await?;
                if let Some(token) = self.lookup(ctx, &key, Lookup::First).await? {
                    return Ok(token);
                }
                self.fetch_and_store(ctx, &key).await
            }
            MissPolicy::SingleFlight => {
                {
                    let _guard = self.read_lock(ctx).await?;
                    if let Some(token) = self.lookup(ctx, &key, Lookup::First).await? {
                        return Ok(token);
                    }
                }
                let _guard = self.write_lock(ctx).await?;
                // another caller may have filled the cache while we waited
                if let Some(token) = self.lookup(ctx, &key, Lookup::Recheck).await? {
                    return Ok(token);
                }
                self.fetch_and_store(ctx, &key).await
            }
        }
    }

    async fn refresh_access_token(&self, ctx: &Context) -> Result<String> {
        let _guard = self.write_lock(ctx).await?;
        let key = self.fetcher.cache_key();
        debug!("refreshing token for key '{}'", key);
        self.fetch_and_store(ctx, &key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SdkError;
    use crate::cache::MemoryCache;
    use crate::tests::common::{MockCache, MockFetcher};

    fn provider(cache: &Arc<MockCache>, fetcher: &Arc<MockFetcher>) -> CachedTokenProvider {
        CachedTokenProvider::new(cache.clone(), fetcher.clone())
    }

    #[tokio::test]
    async fn cache_hit_skips_fetcher() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("mockedCacheKey", "fetchedToken", 3600));
        cache.seed("mockedCacheKey", "cachedToken").await;

        let token = provider(&cache, &fetcher)
            .access_token(&Context::background())
            .await
            .unwrap();

        assert_eq!(token, "cachedToken");
        assert_eq!(fetcher.calls(), 0);
        assert!(cache.sets().is_empty());
    }

    #[tokio::test]
    async fn cache_miss_fetches_once_and_stores_lease() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("mockedCacheKey", "fetchedToken", 3600));

        let token = provider(&cache, &fetcher)
            .access_token(&Context::background())
            .await
            .unwrap();

        assert_eq!(token, "fetchedToken");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(
            cache.sets(),
            vec![(
                "mockedCacheKey".to_owned(),
                "fetchedToken".to_owned(),
                Expiration::After(Duration::from_secs(3600))
            )]
        );
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("k", "fetchedToken", 3600));
        let provider = provider(&cache, &fetcher);
        let ctx = Context::background();

        provider.access_token(&ctx).await.unwrap();
        provider.access_token(&ctx).await.unwrap();
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn any_cache_read_error_counts_as_miss() {
        let cache = Arc::new(MockCache::new().fail_gets());
        let fetcher = Arc::new(MockFetcher::ok("k", "fetchedToken", 60));

        let token = provider(&cache, &fetcher)
            .access_token(&Context::background())
            .await
            .unwrap();
        assert_eq!(token, "fetchedToken");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn fetch_error_is_returned_and_cache_untouched() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::failing("k", "fetcher error"));
        let provider = provider(&cache, &fetcher);
        let ctx = Context::background();

        let err = provider.access_token(&ctx).await.unwrap_err();
        assert!(matches!(err, SdkError::Fetch(_)));
        assert!(err.to_string().contains("fetcher error"));

        let err = provider.refresh_access_token(&ctx).await.unwrap_err();
        assert!(matches!(err, SdkError::Fetch(_)));
        assert!(cache.sets().is_empty());
    }

    #[tokio::test]
    async fn cache_write_error_drops_token() {
        let cache = Arc::new(MockCache::new().fail_sets());
        let fetcher = Arc::new(MockFetcher::ok("k", "fetchedToken", 60));

        let err = provider(&cache, &fetcher)
            .access_token(&Context::background())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Cache(_)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn refresh_always_fetches_and_overwrites() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("mockedCacheKey", "refreshedToken", 120));
        cache.seed("mockedCacheKey", "staleToken").await;

        let provider = provider(&cache, &fetcher);
        let ctx = Context::background();
        assert_eq!(provider.refresh_access_token(&ctx).await.unwrap(), "refreshedToken");
        assert_eq!(provider.refresh_access_token(&ctx).await.unwrap(), "refreshedToken");

        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.value("mockedCacheKey").await.as_deref(), Some("refreshedToken"));
        assert_eq!(cache.sets()[0].2, Expiration::After(Duration::from_secs(120)));
    }

    #[tokio::test]
    async fn zero_lease_uses_cache_default() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("k", "t", 0));
        provider(&cache, &fetcher)
            .access_token(&Context::background())
            .await
            .unwrap();
        assert_eq!(cache.sets()[0].2, Expiration::Default);
    }

    #[tokio::test]
    async fn max_lease_from_fetcher_is_cached() {
        let cache = Arc::new(MemoryCache::new(Duration::from_secs(300), Duration::ZERO));
        let fetcher = Arc::new(MockFetcher::ok("k", "longLived", u64::MAX));
        let provider = CachedTokenProvider::new(cache.clone(), fetcher.clone());
        let ctx = Context::background();

        assert_eq!(provider.access_token(&ctx).await.unwrap(), "longLived");
        assert_eq!(provider.access_token(&ctx).await.unwrap(), "longLived");
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(cache.get(&ctx, "k").await.unwrap(), "longLived");
    }

    #[tokio::test]
    async fn cancelled_context_never_reaches_fetcher() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("k", "t", 60));
        let ctx = Context::background();
        ctx.cancel();

        let err = provider(&cache, &fetcher).access_token(&ctx).await.unwrap_err();
        assert!(err.is_cancellation());
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn single_flight_coalesces_concurrent_misses() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(
            MockFetcher::ok("k", "fetchedToken", 60).with_delay(Duration::from_millis(50)),
        );
        let provider = provider(&cache, &fetcher).with_miss_policy(MissPolicy::SingleFlight);
        let ctx = Context::background();

        let (a, b) = tokio::join!(provider.access_token(&ctx), provider.access_token(&ctx));
        assert_eq!(a.unwrap(), "fetchedToken");
        assert_eq!(b.unwrap(), "fetchedToken");
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn shared_policy_lets_concurrent_misses_both_fetch() {
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(
            MockFetcher::ok("k", "fetchedToken", 60).with_delay(Duration::from_millis(50)),
        );
        let provider = provider(&cache, &fetcher).with_miss_policy(MissPolicy::Shared);
        let ctx = Context::background();

        let (a, b) = tokio::join!(provider.access_token(&ctx), provider.access_token(&ctx));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(fetcher.calls(), 2);
        assert_eq!(cache.sets().len(), 2);
    }

    #[tokio::test]
    async fn metrics_track_hits_misses_and_fetches() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let cache = Arc::new(MockCache::new());
        let fetcher = Arc::new(MockFetcher::ok("k", "t", 60));
        let provider = provider(&cache, &fetcher).with_metrics(metrics.clone());
        let ctx = Context::background();

        provider.access_token(&ctx).await.unwrap();
        provider.access_token(&ctx).await.unwrap();

        assert_eq!(metrics.token_cache_hits.get(), 1);
        // the recheck under the write lock is not a second miss
        assert_eq!(metrics.token_cache_misses.get(), 1);
        assert_eq!(metrics.token_fetches.with_label_values(&["success"]).get(), 1);
    }
}
