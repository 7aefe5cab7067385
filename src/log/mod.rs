//! Level-filtered structured logging facade.
//!
//! Callers hold a [`LogHelper`] built around any [`Logger`] backend; nothing
//! here is global. Key/value pairs travel as a flat sequence built with
//! [`keyvals!`](crate::keyvals).

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

pub mod tracing_adapter;

pub use tracing_adapter::{LogRecord, TracingLogger};

/// Severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl Level {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
        }
    }

    /// Case-insensitive lookup; unknown names fall back to `Debug`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "INFO" => Self::Info,
            "WARN" | "WARNING" => Self::Warn,
            "ERROR" => Self::Error,
            "FATAL" => Self::Fatal,
            _ => Self::Debug,
        }
    }
}

/// A logging backend.
///
/// `keyvals` alternates keys and values. Backends decide how to treat odd
/// lengths and non-string keys.
pub trait Logger: Send + Sync {
    fn log(&self, level: Level, keyvals: &[Value]);
}

/// Convenience wrapper with one method per level.
#[derive(Clone)]
pub struct LogHelper {
    logger: Arc<dyn Logger>,
}

impl LogHelper {
    pub fn new(logger: Arc<dyn Logger>) -> Self {
        Self { logger }
    }

    pub fn log(&self, level: Level, keyvals: &[Value]) {
        self.logger.log(level, keyvals);
    }

    pub fn debug(&self, keyvals: &[Value]) {
        self.logger.log(Level::Debug, keyvals);
    }

    pub fn info(&self, keyvals: &[Value]) {
        self.logger.log(Level::Info, keyvals);
    }

    pub fn warn(&self, keyvals: &[Value]) {
        self.logger.log(Level::Warn, keyvals);
    }

    pub fn error(&self, keyvals: &[Value]) {
        self.logger.log(Level::Error, keyvals);
    }

    /// Backends terminate the process after recording a fatal entry.
    pub fn fatal(&self, keyvals: &[Value]) {
        self.logger.log(Level::Fatal, keyvals);
    }
}

/// Serialize one key or value for a key/value sequence. Values that fail to
/// serialize become `null`.
pub fn value<T: Serialize + ?Sized>(v: &T) -> Value {
    serde_json::to_value(v).unwrap_or(Value::Null)
}

/// Build a flat key/value sequence: `keyvals!["msg", "done", "status", 200]`.
#[macro_export]
macro_rules! keyvals {
    ($($kv:expr),* $(,)?) => {
        vec![$($crate::log::value(&$kv)),*]
    };
}
