//! Storage traits and error types
//!
//! This module defines the trait interface for record store backends and
//! associated error types.

use crate::record::Snapshot;
use crate::store::{DocumentStore, History};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("History file {path} is unreadable: {message}")]
    CorruptHistory { path: String, message: String },

    #[error("History is locked by another run: {0}")]
    Locked(String),

    #[error("Invalid store path: {0}")]
    InvalidPath(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for record store backends
///
/// Every method is scoped to one source; sources never share files, so
/// implementations only need to guard against two runs of the same source.
pub trait RecordStore: Send + Sync {
    /// Writes a snapshot atomically and returns where it landed
    ///
    /// A failed write leaves no partial file visible to readers.
    fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<PathBuf>;

    /// Loads the source's history, `None` if the source never completed a run
    fn load_history(&self, source_id: &str) -> StoreResult<Option<History>>;

    /// Replaces the source's history wholesale
    fn replace_history(&self, source_id: &str, history: &History) -> StoreResult<()>;

    /// Most recently modified snapshot file for the source
    fn latest_snapshot(&self, source_id: &str) -> StoreResult<Option<PathBuf>>;

    /// Document directory handle for the source
    fn documents(&self, source_id: &str) -> DocumentStore;
}
