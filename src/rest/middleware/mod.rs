//! The middleware seam and the bundled middlewares.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Request, Response};

use crate::context::Context;
use crate::error::{Result, SdkError};

pub mod auth;
pub mod log_middleware;
pub mod metrics;

pub use auth::BearerAuthMiddleware;
pub use log_middleware::LogMiddleware;
pub use metrics::MetricsMiddleware;

/// One stage of the request pipeline.
///
/// An implementation may change the request before calling `next`, answer
/// without calling `next` at all, or rework the response `next` returns.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response>;
}

/// The rest of the chain after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    transport: &'a reqwest::Client,
    middlewares: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(transport: &'a reqwest::Client, middlewares: &'a [Arc<dyn Middleware>]) -> Self {
        Self {
            transport,
            middlewares,
        }
    }

    /// Hand the request to the next middleware, or to the transport once the
    /// chain is exhausted. The transport call is abandoned when `ctx` fires.
    pub async fn run(self, ctx: &Context, req: Request) -> Result<Response> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current
                    .handle(ctx, req, Next::new(self.transport, rest))
                    .await
            }
            None => {
                ctx.run(async { self.transport.execute(req).await.map_err(SdkError::from) })
                    .await
            }
        }
    }
}
