//! Store module for persisting run output
//!
//! This module handles all file persistence for the engine, including:
//! - Append-only, timestamp-named snapshot files per source
//! - The single mutable history file per source, replaced wholesale
//! - Per-source document directories for ancillary downloads
//! - Atomic write-then-rename so readers never observe a partial file

mod atomic;
mod csv_export;
mod documents;
mod file;
mod history;
mod traits;

pub use atomic::{atomic_create, atomic_write};
pub use csv_export::write_csv;
pub use documents::{sanitize_file_component, DocumentStore};
pub use file::{FileStore, DOCUMENTS_DIR, HISTORY_FILE};
pub use history::{History, HistoryLock, LOCK_FILE};
pub use traits::{RecordStore, StoreError, StoreResult};

use crate::config::OutputConfig;

/// Opens the file store described by the output configuration
pub fn open_store(config: &OutputConfig) -> FileStore {
    FileStore::new(&config.data_dir).with_csv(config.csv)
}
