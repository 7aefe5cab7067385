use serde::Deserialize;

use crate::token::MissPolicy;

/// ================================
/// Full SDK configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SdkConfig {
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub token: TokenSettings,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// HTTP transport
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct HttpSettings {
    /// whole-request timeout enforced by the transport, on top of any context deadline
    pub timeout_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
    pub user_agent: Option<String>,
}

/// ================================
/// In-memory cache
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// 0 keeps default entries forever
    #[serde(default = "default_expiration_seconds")]
    pub default_expiration_seconds: u64,
    /// 0 disables the background sweep
    #[serde(default = "default_cleanup_interval_seconds")]
    pub cleanup_interval_seconds: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_expiration_seconds: default_expiration_seconds(),
            cleanup_interval_seconds: default_cleanup_interval_seconds(),
        }
    }
}

/// ================================
/// Token provider
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct TokenSettings {
    #[serde(default)]
    pub miss_policy: MissPolicy,
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    #[serde(default = "LogFormat::from_env")]
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Compact,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

impl LogFormat {
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT")
            .unwrap_or_else(|_| "json".to_string())
            .to_lowercase()
            .as_str()
        {
            "compact" | "text" => LogFormat::Compact,
            _ => LogFormat::Json,
        }
    }
}

fn default_expiration_seconds() -> u64 {
    300
}

fn default_cleanup_interval_seconds() -> u64 {
    600
}
