use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Request, Response};
use tokio::time::Instant;

use crate::context::Context;
use crate::error::{Result, SdkError};
use crate::keyvals;
use crate::log::{LogHelper, Logger};
use crate::rest::middleware::{Middleware, Next};

/// Logs every request at info level: a start event, the response body when
/// a response came back, and an end event with the elapsed time whether or
/// not the call failed.
pub struct LogMiddleware {
    log: LogHelper,
}

impl LogMiddleware {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self {
            log: LogHelper::new(logger),
        }
    }
}

#[async_trait]
impl Middleware for LogMiddleware {
    async fn handle(&self, ctx: &Context, req: Request, next: Next<'_>) -> Result<Response> {
        let started = Instant::now();
        let method = req.method().to_string();
        let url = req.url().to_string();
        self.log.info(&keyvals!["msg", "request_start", "method", method, "url", url]);

        let result = match next.run(ctx, req).await {
            Ok(response) => drain_body(ctx, response).await.map(|(response, body)| {
                self.log.info(&keyvals![
                    "msg",
                    "response_body",
                    "status",
                    response.status().as_u16(),
                    "body",
                    String::from_utf8_lossy(&body)
                ]);
                response
            }),
            Err(err) => Err(err),
        };

        self.log.info(&keyvals![
            "msg",
            "request_end",
            "method",
            method,
            "url",
            url,
            "duration",
            format!("{:?}", started.elapsed())
        ]);
        result
    }
}

/// Read the body and hand back an equivalent response wrapping the bytes.
/// The read is abandoned when `ctx` fires; any other read error leaves an
/// empty body.
async fn drain_body(ctx: &Context, response: Response) -> Result<(Response, Bytes)> {
    let status = response.status();
    let version = response.version();
    let headers = response.headers().clone();
    let body = match ctx
        .run(async { response.bytes().await.map_err(SdkError::from) })
        .await
    {
        Ok(body) => body,
        Err(err) if err.is_cancellation() => return Err(err),
        Err(_) => Bytes::new(),
    };

    let mut rebuilt = http::Response::new(body.clone());
    *rebuilt.status_mut() = status;
    *rebuilt.version_mut() = version;
    *rebuilt.headers_mut() = headers;
    Ok((Response::from(rebuilt), body))
}
