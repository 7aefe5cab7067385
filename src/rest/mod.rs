//! HTTP client with a chainable middleware pipeline.
//!
//! A call goes through every registered [`Middleware`] in registration order
//! and ends at the transport. Each middleware receives the outgoing
//! `reqwest::Request` together with a [`Next`] continuation and returns the
//! `reqwest::Response` its predecessor should see.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Body;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

use crate::context::Context;
use crate::error::Result;

pub mod client;
pub mod middleware;

pub use client::HttpClient;
pub use middleware::{Middleware, Next};

#[async_trait]
pub trait Client: Send + Sync {
    /// Send one request through the middleware chain.
    ///
    /// `payload` must be present; an empty [`RequestPayload`] sends no body.
    /// A `None` payload fails with [`crate::SdkError::InvalidPayload`] before
    /// anything touches the network.
    async fn do_request(
        &self,
        ctx: &Context,
        method: &str,
        url: &str,
        headers: &HashMap<String, String>,
        payload: Option<RequestPayload>,
    ) -> Result<HttpResponse>;

    /// Append a middleware to the end of the chain.
    fn use_middleware(&mut self, middleware: Arc<dyn Middleware>);
}

/// A file part of a multipart upload. The content is streamed, never
/// buffered by the client.
#[derive(Debug)]
pub struct FileField {
    pub filename: String,
    pub content: Body,
}

impl FileField {
    pub fn new(filename: impl Into<String>, content: impl Into<Body>) -> Self {
        Self {
            filename: filename.into(),
            content: content.into(),
        }
    }

    pub fn from_reader<R>(filename: impl Into<String>, reader: R) -> Self
    where
        R: AsyncRead + Send + Sync + 'static,
    {
        Self {
            filename: filename.into(),
            content: Body::wrap_stream(ReaderStream::new(reader)),
        }
    }
}

/// What to send with a request.
///
/// Any form or file field turns the request into `multipart/form-data`, in
/// which case `body` is ignored. Fields are sent in key order.
#[derive(Debug, Default)]
pub struct RequestPayload {
    pub body: Option<Body>,
    pub form_fields: BTreeMap<String, String>,
    pub file_fields: BTreeMap<String, FileField>,
}

impl RequestPayload {
    /// No body, no fields.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn raw(body: impl Into<Body>) -> Self {
        Self {
            body: Some(body.into()),
            ..Self::default()
        }
    }

    pub fn form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    pub fn file_field(mut self, name: impl Into<String>, file: FileField) -> Self {
        self.file_fields.insert(name.into(), file);
        self
    }

    pub fn is_multipart(&self) -> bool {
        !self.form_fields.is_empty() || !self.file_fields.is_empty()
    }
}

/// A fully read response.
///
/// Header names are lowercase; repeated headers keep every value in
/// arrival order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub body: Bytes,
    pub headers: HashMap<String, Vec<String>>,
    pub content_type: String,
}

impl HttpResponse {
    /// First value of a header, looked up case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}
