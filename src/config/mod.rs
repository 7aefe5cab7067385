//! SDK configuration: settings types, YAML loading and log subscriber setup.

pub mod loader;
pub mod logging;
pub mod settings;

pub use loader::{load_config, parse_config};
pub use settings::{CacheSettings, HttpSettings, LogFormat, LoggingConfig, SdkConfig, TokenSettings};
