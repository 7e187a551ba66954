use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Environment variable naming the upstream proxy
pub const PROXY_ENV: &str = "PROXY_URL";

/// Environment variable overriding the scheduled interval (hours)
pub const INTERVAL_ENV: &str = "SCRAPER_INTERVAL_HOURS";

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Applies environment overrides on top of a loaded configuration
///
/// `lookup` resolves a variable name to its value; `main` passes
/// `std::env::var`, tests pass a closure over a fixed map.
///
/// * `PROXY_URL` replaces `session.proxy`
/// * `SCRAPER_INTERVAL_HOURS` replaces `run.interval-hours`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(proxy) = lookup(PROXY_ENV).filter(|p| !p.trim().is_empty()) {
        config.session.proxy = Some(proxy.trim().to_string());
    }

    if let Some(raw) = lookup(INTERVAL_ENV) {
        let hours = raw.trim().parse::<u64>().map_err(|_| {
            ConfigError::Validation(format!(
                "{} must be a whole number of hours, got '{}'",
                INTERVAL_ENV, raw
            ))
        })?;
        config.run.interval_hours = hours;
    }

    Ok(())
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so snapshots can be traced back to the config that produced them.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
