use std::fs;
use std::path::Path;

use anyhow::{bail, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::settings::{LoggingConfig, SdkConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Load and validate config from YAML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SdkConfig> {
    let content = fs::read_to_string(path)?;
    let expanded = expand_env_vars(&content)?;
    parse_config(&expanded)
}

pub fn parse_config(content: &str) -> Result<SdkConfig> {
    let mut config: SdkConfig = serde_yaml::from_str(content)
        .inspect_err(|e| error!("parse config error: {}", e))?;

    // Apply defaults
    if config.logging.is_none() {
        config.logging = Some(LoggingConfig::default());
    }

    debug!("validation config ...");
    validate(&config)?;
    Ok(config)
}

fn validate(config: &SdkConfig) -> Result<()> {
    if let Some(logging) = &config.logging {
        let level = logging.level.to_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            bail!("Unsupported log level '{}'", logging.level);
        }
    }
    if let Some(user_agent) = &config.http.user_agent {
        if user_agent.trim().is_empty() {
            bail!("http.user_agent must not be blank");
        }
    }
    Ok(())
}

/// Replace `${VAR}` and `${VAR:default}` with environment values.
fn expand_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}")?;
    let expanded = re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    });
    Ok(expanded.to_string())
}
