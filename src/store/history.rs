use crate::record::Snapshot;
use crate::store::{StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the lock file guarding a source's history
pub const LOCK_FILE: &str = ".history.lock";

/// A lock older than this is assumed to be left over from a crashed run
const STALE_LOCK_AGE: Duration = Duration::from_secs(10 * 60);

/// Record identifiers seen by the most recent successful run of a source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct History {
    pub last_updated: DateTime<Utc>,
    /// Ordered set: membership is a tree lookup and the JSON array is written sorted
    pub record_ids: BTreeSet<String>,
    pub total_count: usize,
}

impl History {
    /// History describing exactly the records of `snapshot`
    ///
    /// Prior history is never merged in.
    pub fn from_snapshot(snapshot: &Snapshot, last_updated: DateTime<Utc>) -> Self {
        let record_ids = snapshot.record_ids();
        Self {
            last_updated,
            total_count: record_ids.len(),
            record_ids,
        }
    }

    pub fn contains(&self, record_id: &str) -> bool {
        self.record_ids.contains(record_id)
    }
}

/// Exclusive-create lock file held while a history is replaced
///
/// Released on drop.
#[derive(Debug)]
pub struct HistoryLock {
    path: PathBuf,
}

impl HistoryLock {
    pub fn acquire(dir: &Path) -> StoreResult<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join(LOCK_FILE);

        for attempt in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{}", std::process::id()) {
                        tracing::debug!("Could not record pid in {}: {}", path.display(), e);
                    }
                    return Ok(Self { path });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if attempt == 0 && is_stale(&path) {
                        tracing::warn!("Removing stale history lock {}", path.display());
                        if let Err(e) = fs::remove_file(&path) {
                            tracing::warn!(
                                "Failed to remove stale lock {}: {}",
                                path.display(),
                                e
                            );
                        }
                        continue;
                    }
                    return Err(StoreError::Locked(path.display().to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::Locked(path.display().to_string()))
    }
}

impl Drop for HistoryLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!("Failed to release history lock {}: {}", self.path.display(), e);
        }
    }
}

fn is_stale(path: &Path) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .map(|age| age > STALE_LOCK_AGE)
        .unwrap_or(false)
}
