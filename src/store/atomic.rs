use crate::store::{StoreError, StoreResult};
use std::fs;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Writes a file through a sibling temporary file and an atomic rename
///
/// `write` receives a buffered writer over the temporary file. If it fails, or the
/// process dies before the rename, the temporary file is discarded and whatever was
/// at `path` before stays untouched.
pub fn atomic_write<F>(path: &Path, write: F) -> StoreResult<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let tmp = stage(parent_dir(path)?, write)?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

/// Like [`atomic_write`], but never replaces an existing file
///
/// `candidate(n)` names the target for attempt `n`, starting at 0. Each name is
/// claimed with a no-clobber rename, so a concurrent writer taking the same name
/// makes this one move on to the next candidate.
pub fn atomic_create<N, F>(mut candidate: N, write: F) -> StoreResult<PathBuf>
where
    N: FnMut(u32) -> PathBuf,
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let first = candidate(0);
    let mut tmp = stage(parent_dir(&first)?, write)?;

    let mut attempt = 0;
    let mut path = first;
    loop {
        match tmp.persist_noclobber(&path) {
            Ok(_) => return Ok(path),
            Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
                tmp = e.file;
                attempt += 1;
                path = candidate(attempt);
            }
            Err(e) => return Err(StoreError::Io(e.error)),
        }
    }
}

fn parent_dir(path: &Path) -> StoreResult<&Path> {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| StoreError::InvalidPath(path.display().to_string()))
}

/// Writes and syncs the content into a temporary file inside `dir`
fn stage<F>(dir: &Path, write: F) -> StoreResult<NamedTempFile>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    fs::create_dir_all(dir)?;

    let mut tmp = tempfile::Builder::new().prefix(".tmp-").tempfile_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    Ok(tmp)
}
