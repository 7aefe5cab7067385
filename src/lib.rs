//! # SDK core
//!
//! Building blocks for API client SDKs: an HTTP client with a middleware
//! pipeline, a cache-first access token provider, an in-memory expiring
//! cache and a structured logging facade backed by `tracing`.
//!
//! Modules:
//! - `context`: cancellation and deadlines threaded through every call
//! - `cache`: cache seam and the in-memory implementation
//! - `token`: token fetcher/provider seams and the caching provider
//! - `rest`: HTTP client, payloads, middleware chain
//! - `log`: level-filtered key/value logging facade
//! - `config`: YAML settings and subscriber setup
//! - `observability`: prometheus collectors
//! - `tools`: URL and API error helpers

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod log;
pub mod observability;
pub mod rest;
pub mod token;
pub mod tools;

#[cfg(test)]
pub(crate) mod tests;

pub use crate::cache::{Cache, Expiration, MemoryCache};
pub use crate::context::Context;
pub use crate::error::{Result, SdkError};
pub use crate::rest::{Client, HttpClient, HttpResponse, RequestPayload};
pub use crate::token::{CachedTokenProvider, TokenFetcher, TokenProvider};
