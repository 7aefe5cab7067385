use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::level_filters::LevelFilter;

use crate::log::{Level, Logger};

/// Keys whose value becomes the record message instead of a field.
const MESSAGE_KEYS: [&str; 2] = ["msg", "message"];
const TARGET: &str = "sdk_core";

/// A normalized entry ready to hand to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub message: String,
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Normalize a flat key/value sequence. An odd trailing key gets an
    /// empty-string value; a pair whose key is not a string is dropped. A
    /// message value that is not a string leaves the message empty.
    pub fn from_keyvals(level: Level, keyvals: &[Value]) -> Self {
        let padding = Value::String(String::new());
        let mut message = String::new();
        let mut fields = Map::new();

        for pair in keyvals.chunks(2) {
            let Some(key) = pair[0].as_str() else {
                continue;
            };
            let value = pair.get(1).unwrap_or(&padding);
            if MESSAGE_KEYS.contains(&key) {
                message = value.as_str().unwrap_or_default().to_owned();
                continue;
            }
            fields.insert(key.to_owned(), value.clone());
        }

        Self { level, message, fields }
    }

    /// `tracing` field names are fixed at the call site, so the pairs travel
    /// as one `fields` value holding their JSON object text.
    fn emit(&self) {
        let fields = Value::Object(self.fields.clone());
        let message = self.message.as_str();
        match self.level {
            Level::Debug => tracing::debug!(target: TARGET, fields = %fields, "{}", message),
            Level::Info => tracing::info!(target: TARGET, fields = %fields, "{}", message),
            Level::Warn => tracing::warn!(target: TARGET, fields = %fields, "{}", message),
            Level::Error => tracing::error!(target: TARGET, fields = %fields, "{}", message),
            Level::Fatal => tracing::error!(target: TARGET, fatal = true, fields = %fields, "{}", message),
        }
    }
}

/// [`Logger`] writing through `tracing`.
///
/// Entries below `min_level` are dropped before any formatting. The
/// key/value pairs reach subscribers as a single `fields` value rendered as
/// a JSON object, not as individual `tracing` fields. Fatal
/// entries run the fatal hook after being written; the default hook exits
/// the process with status 1.
#[derive(Clone)]
pub struct TracingLogger {
    min_level: LevelFilter,
    on_fatal: Arc<dyn Fn() + Send + Sync>,
}

impl TracingLogger {
    pub fn new(min_level: LevelFilter) -> Self {
        Self {
            min_level,
            on_fatal: Arc::new(|| std::process::exit(1)),
        }
    }

    /// Follow the max level of the installed subscriber.
    pub fn current() -> Self {
        Self::new(LevelFilter::current())
    }

    pub fn with_fatal_hook(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_fatal = Arc::new(hook);
        self
    }

    pub fn native_level(level: Level) -> tracing::Level {
        match level {
            Level::Debug => tracing::Level::DEBUG,
            Level::Info => tracing::Level::INFO,
            Level::Warn => tracing::Level::WARN,
            Level::Error | Level::Fatal => tracing::Level::ERROR,
        }
    }

    pub fn enabled(&self, level: Level) -> bool {
        Self::native_level(level) <= self.min_level
    }

    /// The record this logger would write, `None` when suppressed.
    pub fn record(&self, level: Level, keyvals: &[Value]) -> Option<LogRecord> {
        if !self.enabled(level) || keyvals.is_empty() {
            return None;
        }
        Some(LogRecord::from_keyvals(level, keyvals))
    }
}

impl Logger for TracingLogger {
    fn log(&self, level: Level, keyvals: &[Value]) {
        if let Some(record) = self.record(level, keyvals) {
            record.emit();
        }
        if level == Level::Fatal {
            (self.on_fatal)();
        }
    }
}
