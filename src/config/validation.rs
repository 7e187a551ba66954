use crate::config::types::{Config, OutputConfig, RunConfig, SessionConfig, SourceEntry};
use crate::source::SourceKind;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_session_config(&config.session)?;
    validate_run_config(&config.run)?;
    validate_output_config(&config.output)?;
    validate_sources(&config.sources)?;
    Ok(())
}

/// Validates session configuration
fn validate_session_config(config: &SessionConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be at least 1x1, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.max_scroll_rounds < 1 || config.max_scroll_rounds > 200 {
        return Err(ConfigError::Validation(format!(
            "max-scroll-rounds must be between 1 and 200, got {}",
            config.max_scroll_rounds
        )));
    }

    if config.navigation_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "navigation-timeout-ms must be >= 1000ms, got {}ms",
            config.navigation_timeout_ms
        )));
    }

    if config.download_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "download-timeout-secs must be >= 1".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Longest accepted scheduling interval: one year
pub const MAX_INTERVAL_HOURS: u64 = 24 * 365;

/// Validates pacing configuration
fn validate_run_config(config: &RunConfig) -> Result<(), ConfigError> {
    if config.interval_hours < 1 {
        return Err(ConfigError::Validation(format!(
            "interval-hours must be >= 1, got {}",
            config.interval_hours
        )));
    }

    if config.interval_hours > MAX_INTERVAL_HOURS {
        return Err(ConfigError::Validation(format!(
            "interval-hours must be <= {}, got {}",
            MAX_INTERVAL_HOURS, config.interval_hours
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.data_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "data-dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates source entries: known kinds, no duplicates, usable base URLs
fn validate_sources(sources: &[SourceEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in sources {
        let kind = SourceKind::from_name(&entry.kind)
            .ok_or_else(|| ConfigError::UnknownSource(entry.kind.clone()))?;

        if !seen.insert(kind) {
            return Err(ConfigError::Validation(format!(
                "source '{}' is listed more than once",
                entry.kind
            )));
        }

        if let Some(base_url) = &entry.base_url {
            let url = Url::parse(base_url).map_err(|e| {
                ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", base_url, e))
            })?;

            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Validation(format!(
                    "base-url '{}' must use http or https",
                    base_url
                )));
            }
        }
    }

    Ok(())
}
