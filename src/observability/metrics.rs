use anyhow::Result;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Prometheus collectors for the HTTP client and the token provider.
///
/// Each instance owns its registry; hand an `Arc<Metrics>` to the
/// components that should report into it.
#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // HTTP client metrics
    pub http_requests: IntCounterVec,
    pub http_failures: IntCounterVec,
    pub http_duration: HistogramVec,

    // Token provider metrics
    pub token_cache_hits: IntCounter,
    pub token_cache_misses: IntCounter,
    pub token_fetches: IntCounterVec,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        Self::with_registry(Registry::new_custom(Some("sdk".into()), None)?)
    }

    pub fn with_registry(registry: Registry) -> prometheus::Result<Self> {
        let metrics = Self {
            // HTTP
            http_requests: IntCounterVec::new(Opts::new("http_client_requests_total", "Completed requests by method and status"), &["method", "status"])?,
            http_failures: IntCounterVec::new(Opts::new("http_client_failures_total", "Requests that ended in an error"), &["method", "reason"])?,
            http_duration: HistogramVec::new(HistogramOpts::new("http_client_request_duration_seconds", "Request duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["method"])?,

            // Token
            token_cache_hits: IntCounter::new("token_cache_hits_total", "Access tokens served from cache")?,
            token_cache_misses: IntCounter::new("token_cache_misses_total", "Access token cache misses")?,
            token_fetches: IntCounterVec::new(Opts::new("token_fetches_total", "Token fetcher calls by outcome"), &["outcome"])?,

            registry,
        };

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.http_requests.clone()))?;
        reg.register(Box::new(metrics.http_failures.clone()))?;
        reg.register(Box::new(metrics.http_duration.clone()))?;
        reg.register(Box::new(metrics.token_cache_hits.clone()))?;
        reg.register(Box::new(metrics.token_cache_misses.clone()))?;
        reg.register(Box::new(metrics.token_fetches.clone()))?;

        Ok(metrics)
    }

    /// Text exposition format of everything in the registry.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
