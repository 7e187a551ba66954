use crate::record::{Record, Snapshot};
use crate::store::csv_export::write_csv;
use crate::store::{
    atomic_create, atomic_write, DocumentStore, History, HistoryLock, RecordStore, StoreError,
    StoreResult,
};
use chrono::{DateTime, Utc};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Fixed name of the per-source history file
pub const HISTORY_FILE: &str = "history.json";

/// Directory name for downloaded documents inside a source directory
pub const DOCUMENTS_DIR: &str = "documents";

/// File-backed record store
///
/// Layout under `root`:
///
/// ```text
/// <source_id>/<source_id>_<YYYYmmdd_HHMMSS_mmm>.json   one per run, never rewritten
/// <source_id>/<source_id>_<YYYYmmdd_HHMMSS_mmm>.csv    optional companion export
/// <source_id>/history.json                              replaced by every successful run
/// <source_id>/documents/                                ancillary downloads
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    csv: bool,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            csv: false,
        }
    }

    /// Enables the companion CSV export
    pub fn with_csv(mut self, csv: bool) -> Self {
        self.csv = csv;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source_dir(&self, source_id: &str) -> PathBuf {
        self.root.join(source_id)
    }

    pub fn history_path(&self, source_id: &str) -> PathBuf {
        self.source_dir(source_id).join(HISTORY_FILE)
    }

    /// Candidate snapshot path for a run started at `fetched_at`
    ///
    /// The timestamp sorts lexically; attempts after the first carry a numeric suffix.
    pub fn snapshot_path(
        &self,
        source_id: &str,
        fetched_at: DateTime<Utc>,
        attempt: u32,
    ) -> PathBuf {
        let stem = format!("{}_{}", source_id, fetched_at.format("%Y%m%d_%H%M%S_%3f"));
        let name = match attempt {
            0 => format!("{}.json", stem),
            n => format!("{}_{}.json", stem, n),
        };
        self.source_dir(source_id).join(name)
    }

    /// All snapshot files for a source, oldest name first
    pub fn list_snapshots(&self, source_id: &str) -> StoreResult<Vec<PathBuf>> {
        let dir = self.source_dir(source_id);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_", source_id);
        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let is_snapshot = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with(&prefix) && n.ends_with(".json"))
                .unwrap_or(false);
            if is_snapshot {
                paths.push(path);
            }
        }

        paths.sort();
        Ok(paths)
    }

    /// Reads the records of one snapshot file
    pub fn read_snapshot(path: &Path) -> StoreResult<Vec<Record>> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl RecordStore for FileStore {
    fn write_snapshot(&self, snapshot: &Snapshot) -> StoreResult<PathBuf> {
        let path = atomic_create(
            |attempt| self.snapshot_path(snapshot.source_id(), snapshot.fetched_at(), attempt),
            |w| {
                serde_json::to_writer_pretty(&mut *w, snapshot.records())?;
                w.write_all(b"\n")
            },
        )?;

        if self.csv {
            let csv_path = path.with_extension("csv");
            if let Err(e) = atomic_write(&csv_path, |w| write_csv(snapshot.records(), w)) {
                tracing::warn!("Failed to write CSV export {}: {}", csv_path.display(), e);
            }
        }

        tracing::debug!(
            "Wrote {} records to {}",
            snapshot.len(),
            path.display()
        );
        Ok(path)
    }

    fn load_history(&self, source_id: &str) -> StoreResult<Option<History>> {
        let path = self.history_path(source_id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content)
            .map(Some)
            .map_err(|e| StoreError::CorruptHistory {
                path: path.display().to_string(),
                message: e.to_string(),
            })
    }

    fn replace_history(&self, source_id: &str, history: &History) -> StoreResult<()> {
        let dir = self.source_dir(source_id);
        let _lock = HistoryLock::acquire(&dir)?;

        atomic_write(&dir.join(HISTORY_FILE), |w| {
            serde_json::to_writer_pretty(&mut *w, history)?;
            w.write_all(b"\n")
        })
    }

    fn latest_snapshot(&self, source_id: &str) -> StoreResult<Option<PathBuf>> {
        let mut latest: Option<(std::time::SystemTime, PathBuf)> = None;

        for path in self.list_snapshots(source_id)? {
            let modified = fs::metadata(&path)?.modified()?;
            let newer = match &latest {
                None => true,
                Some((best, best_path)) => (modified, &path) > (*best, best_path),
            };
            if newer {
                latest = Some((modified, path));
            }
        }

        Ok(latest.map(|(_, path)| path))
    }

    fn documents(&self, source_id: &str) -> DocumentStore {
        DocumentStore::new(self.source_dir(source_id).join(DOCUMENTS_DIR))
    }
}
