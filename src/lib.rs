//! rwa-watch: listing acquisition and change detection for tokenized real estate
//!
//! This crate drives a set of independently-structured listing sources through a
//! headless session, normalizes every listing into a [`record::Record`], persists one
//! dated snapshot per run, and reports which listings are new since the previous run.

pub mod batch;
pub mod config;
pub mod detect;
pub mod record;
pub mod run;
pub mod session;
pub mod source;
pub mod store;

use thiserror::Error;

/// Main error type for rwa-watch operations
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session error: {0}")]
    Session(#[from] session::SessionError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Invalid run state transition: {from} -> {to}")]
    InvalidTransition {
        from: run::RunState,
        to: run::RunState,
    },

    #[error("Run aborted unexpectedly: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown source kind in config: {0}")]
    UnknownSource(String),
}

/// Result type alias for rwa-watch operations
pub type Result<T> = std::result::Result<T, WatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use batch::{BatchSettings, Orchestrator, Selection};
pub use config::Config;
pub use detect::detect_new;
pub use record::{Record, Snapshot};
pub use run::{BatchReport, RunController, RunReport, RunState, RunStatus};
