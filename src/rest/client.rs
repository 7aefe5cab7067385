use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use http::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Request, Response, Url};
use tracing::debug;

use crate::config::settings::HttpSettings;
use crate::context::Context;
use crate::error::{Result, SdkError};
use crate::rest::middleware::{Middleware, Next};
use crate::rest::{Client, HttpResponse, RequestPayload};

const FILE_CONTENT_TYPE: &str = "application/octet-stream";

/// [`Client`] over a shared `reqwest::Client`.
///
/// Middlewares are registered through `&mut self` before the client is
/// shared, so a running request never observes a changing chain.
#[derive(Clone, Default)]
pub struct HttpClient {
    transport: reqwest::Client,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::with_transport(reqwest::Client::new())
    }

    pub fn with_transport(transport: reqwest::Client) -> Self {
        Self {
            transport,
            middlewares: Vec::new(),
        }
    }

    pub fn with_settings(settings: &HttpSettings) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(ms) = settings.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = settings.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(agent) = &settings.user_agent {
            builder = builder.user_agent(agent.as_str());
        }
        Ok(Self::with_transport(builder.build()?))
    }

    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    fn build_request(
        &self,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: RequestPayload,
    ) -> Result<Request> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| SdkError::InvalidRequest(format!("method '{}': {}", method, e)))?;
        let url = Url::parse(url)
            .map_err(|e| SdkError::InvalidRequest(format!("url '{}': {}", url, e)))?;

        let multipart = payload.is_multipart();
        let mut builder = self.transport.request(method, url);
        for (name, value) in headers {
            // the multipart encoder sets its own boundary
            if multipart && name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }

        if multipart {
            let mut form = Form::new();
            for (name, value) in payload.form_fields {
                form = form.text(name, value);
            }
            for (name, file) in payload.file_fields {
                let part = Part::stream(file.content)
                    .file_name(file.filename)
                    .mime_str(FILE_CONTENT_TYPE)?;
                form = form.part(name, part);
            }
            builder = builder.multipart(form);
        } else if let Some(body) = payload.body {
            builder = builder.body(body);
        }

        Ok(builder.build()?)
    }
}

#[async_trait]
impl Client for HttpClient {
    async fn do_request(
        &self,
        ctx: &Context,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: Option<RequestPayload>,
    ) -> Result<HttpResponse> {
        let payload = payload.ok_or(SdkError::InvalidPayload)?;
        let request = self.build_request(method, url, headers, payload)?;
        debug!("{} {} through {} middleware(s)", request.method(), request.url(), self.middlewares.len());

        let response = Next::new(&self.transport, &self.middlewares)
            .run(ctx, request)
            .await?;
        read_response(ctx, response).await
    }

    fn use_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }
}

async fn read_response(ctx: &Context, response: Response) -> Result<HttpResponse> {
    let status_code = response.status().as_u16();
    let headers = collect_headers(response.headers());
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_owned();
    let body = ctx
        .run(async { response.bytes().await.map_err(SdkError::from) })
        .await?;

    Ok(HttpResponse {
        status_code,
        body,
        headers,
        content_type,
    })
}

fn collect_headers(headers: &HeaderMap) -> HashMap<String, Vec<String>> {
    let mut collected: HashMap<String, Vec<String>> = HashMap::new();
    for (name, value) in headers {
        collected
            .entry(name.as_str().to_owned())
            .or_default()
            .push(String::from_utf8_lossy(value.as_bytes()).into_owned());
    }
    collected
}
