//! Configuration module for rwa-watch
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! plus the environment overrides (`PROXY_URL`, `SCRAPER_INTERVAL_HOURS`).
//!
//! # Example
//!
//! ```no_run
//! use rwa_watch::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("watch.toml")).unwrap();
//! println!("Item pause: {}ms", config.run.item_pause_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_sources, Config, OutputConfig, Renderer, RunConfig, SessionConfig, SourceEntry,
};

// Re-export parser functions
pub use parser::{
    apply_env_overrides, compute_config_hash, load_config, load_config_with_hash, parse_config,
};
pub use validation::validate;

impl Config {
    /// Configured sources, or the built-in roster when none are listed
    pub fn effective_sources(&self) -> Vec<SourceEntry> {
        if self.sources.is_empty() {
            default_sources()
        } else {
            self.sources.clone()
        }
    }
}
