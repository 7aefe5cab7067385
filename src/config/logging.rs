use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig, SdkConfig};

/// Filter used when the configured level does not parse.
const FALLBACK_FILTER: &str = "debug";

/// Install the subscriber described by `config`; `level_override`
/// (for example from an env var or CLI flag) wins over the configured level.
/// Returns whether this call installed it.
pub fn init(config: &SdkConfig, level_override: Option<&str>) -> bool {
    init_logging(&effective_config(config, level_override))
}

fn effective_config(config: &SdkConfig, level_override: Option<&str>) -> LoggingConfig {
    let base = config.logging.clone().unwrap_or_default();
    match level_override {
        Some(level) => LoggingConfig::new(level.to_owned(), base.format),
        None => base,
    }
}

/// Install a process-wide `tracing` subscriber writing JSON lines or compact
/// text with RFC 3339 UTC timestamps.
///
/// The SDK never replaces a subscriber the host application already set up:
/// when one is installed, by the host or by an earlier call, nothing changes
/// and `false` is returned.
pub fn init_logging(cfg: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    let installed = match cfg.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_timer(UtcTime::rfc_3339())
                    .with_ansi(false),
            )
            .try_init(),
        LogFormat::Compact => registry
            .with(fmt::layer().compact().with_timer(UtcTime::rfc_3339()))
            .try_init(),
    };
    installed.is_ok()
}
