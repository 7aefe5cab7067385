use std::sync::Arc;

use async_trait::async_trait;
use http::header::AUTHORIZATION;
use http::HeaderValue;
use reqwest::{Request, Response};

use crate::context::Context;
use crate::error::{Result, SdkError};
use crate::rest::middleware::{Middleware, Next};
use crate::token::TokenProvider;

/// Sets `Authorization: Bearer <token>` from a [`TokenProvider`],
/// replacing any existing value. A provider error fails the request before
/// it is sent.
pub struct BearerAuthMiddleware {
    provider: Arc<dyn TokenProvider>,
}

impl BearerAuthMiddleware {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Middleware for BearerAuthMiddleware {
    async fn handle(&self, ctx: &Context, mut req: Request, next: Next<'_>) -> Result<Response> {
        let token = self.provider.access_token(ctx).await?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| SdkError::InvalidRequest(format!("authorization header: {}", e)))?;
        value.set_sensitive(true);
        req.headers_mut().insert(AUTHORIZATION, value);
        next.run(ctx, req).await
    }
}
