// tests/common/mod.rs
pub use axum::Router;
pub use tokio::task::JoinHandle;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::cache::{Cache, Expiration, MemoryCache};
use crate::context::Context;
use crate::error::{Result, SdkError};
use crate::log::{Level, LogRecord, Logger};
use crate::token::{FetchedToken, TokenFetcher};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, base url)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr: SocketAddr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, format!("http://{}", addr))
}

/// Raw HTTP/1.1 server that sends the status line, headers and the first
/// bytes of a 10 byte body, then stalls for `stall` before sending the rest.
pub async fn spawn_stalled_body(stall: Duration) -> (JoinHandle<()>, String) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr: SocketAddr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0u8; 4096];
                let _ = socket.read(&mut request).await;
                let head = "HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\ncontent-length: 10\r\n\r\nabcd";
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.flush().await;
                tokio::time::sleep(stall).await;
                let _ = socket.write_all(b"efghij").await;
            });
        }
    });
    (handle, format!("http://{}", addr))
}

/// Cache double: real in-memory storage plus switchable failures and a log
/// of successful writes.
pub struct MockCache {
    store: MemoryCache,
    fail_gets: bool,
    fail_sets: bool,
    sets: Mutex<Vec<(String, String, Expiration)>>,
}

impl MockCache {
    pub fn new() -> Self {
        Self {
            store: MemoryCache::new(Duration::from_secs(300), Duration::ZERO),
            fail_gets: false,
            fail_sets: false,
            sets: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }

    pub fn fail_sets(mut self) -> Self {
        self.fail_sets = true;
        self
    }

    pub async fn seed(&self, key: &str, value: &str) {
        self.store
            .set(&Context::background(), key, value, Expiration::Never)
            .await
            .unwrap();
    }

    pub async fn value(&self, key: &str) -> Option<String> {
        self.store.get(&Context::background(), key).await.ok()
    }

    pub fn sets(&self) -> Vec<(String, String, Expiration)> {
        self.sets.lock().unwrap().clone()
    }
}

#[async_trait]
impl Cache for MockCache {
    async fn set(&self, ctx: &Context, key: &str, value: &str, ttl: Expiration) -> Result<()> {
        ctx.check()?;
        if self.fail_sets {
            return Err(SdkError::Cache("cache write failure".into()));
        }
        self.store.set(ctx, key, value, ttl).await?;
        self.sets.lock().unwrap().push((key.to_owned(), value.to_owned(), ttl));
        Ok(())
    }

    async fn get(&self, ctx: &Context, key: &str) -> Result<String> {
        ctx.check()?;
        if self.fail_gets {
            return Err(SdkError::Cache("cache read failure".into()));
        }
        self.store.get(ctx, key).await
    }

    async fn delete(&self, ctx: &Context, key: &str) -> Result<()> {
        self.store.delete(ctx, key).await
    }
}

/// Fetcher double returning a fixed token or a fixed error.
pub struct MockFetcher {
    key: String,
    outcome: std::result::Result<FetchedToken, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockFetcher {
    pub fn ok(key: &str, token: &str, lease_seconds: u64) -> Self {
        Self::with_outcome(key, Ok(FetchedToken::new(token, lease_seconds)))
    }

    pub fn failing(key: &str, message: &str) -> Self {
        Self::with_outcome(key, Err(message.to_owned()))
    }

    fn with_outcome(key: &str, outcome: std::result::Result<FetchedToken, String>) -> Self {
        Self {
            key: key.to_owned(),
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenFetcher for MockFetcher {
    async fn fetch_token(&self, ctx: &Context) -> Result<FetchedToken> {
        ctx.check()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            ctx.run(async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
        match &self.outcome {
            Ok(token) => Ok(token.clone()),
            Err(message) => Err(SdkError::fetch(anyhow!("{}", message))),
        }
    }

    fn cache_key(&self) -> String {
        self.key.clone()
    }
}

/// Logger keeping every normalized record in memory.
#[derive(Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<LogRecord>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.records().into_iter().map(|record| record.message).collect()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, level: Level, keyvals: &[Value]) {
        self.records
            .lock()
            .unwrap()
            .push(LogRecord::from_keyvals(level, keyvals));
    }
}

/// Shared hit counter for test handlers.
#[derive(Clone, Default)]
pub struct Hits(Arc<AtomicUsize>);

impl Hits {
    pub fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}
