use crate::store::{atomic_write, StoreResult};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Per-source directory of downloaded ancillary documents
///
/// Files are named `<record_id>_<suffix>.<ext>`.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(record_id: &str, suffix: &str, ext: &str) -> String {
        format!(
            "{}_{}.{}",
            sanitize_file_component(record_id),
            sanitize_file_component(suffix),
            sanitize_file_component(ext)
        )
    }

    /// Stores one document and returns its path
    pub fn save(
        &self,
        record_id: &str,
        suffix: &str,
        ext: &str,
        bytes: &[u8],
    ) -> StoreResult<PathBuf> {
        let path = self.dir.join(Self::file_name(record_id, suffix, ext));
        atomic_write(&path, |w| w.write_all(bytes))?;
        Ok(path)
    }
}

/// Replaces characters that are unsafe in file names
pub fn sanitize_file_component(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_whitespace() || c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".to_string()
    } else {
        cleaned
    }
}
