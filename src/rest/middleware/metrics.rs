use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::context::Context;
use crate::error::Result;
use crate::observability::metrics::Metrics;
use crate::rest::middleware::{Middleware, Next};

/// Counts requests by method and status and observes their latency.
/// Failures are counted by method and reason (`canceled` or `error`).
pub struct MetricsMiddleware {
    metrics: Arc<Metrics>,
}

impl MetricsMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl Middleware for MetricsMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        let method = req.method().as_str().to_owned();
        let timer = self
            .metrics
            .http_duration
            .with_label_values(&[method.as_str()])
            .start_timer();

        let result = next.run(ctx, req).await;
        timer.observe_duration();

        match &result {
            Ok(response) => {
                let status = response.status().as_u16().to_string();
                self.metrics
                    .http_requests
                    .with_label_values(&[method.as_str(), status.as_str()])
                    .inc();
            }
            Err(err) => {
                let reason = if err.is_cancellation() { "canceled" } else { "error" };
                self.metrics
                    .http_failures
                    .with_label_values(&[method.as_str(), reason])
                    .inc();
            }
        }
        result
    }
}
