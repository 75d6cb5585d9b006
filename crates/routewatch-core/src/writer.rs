//! Crash-safe artifact persistence.
//!
//! Text goes to a temporary sibling of the target, is synced, then renamed
//! over the target. The rename is the only transition a reader can see, so
//! the target always holds one complete rendering. If anything fails before
//! the rename the temporary file is removed and the target is untouched.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{Result, WatchError};

/// Prefix of temporary siblings, hidden from naive directory globbing.
const TEMP_PREFIX: &str = ".routewatch-";

/// Mode of the published artifact. The consumer usually runs as another user.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// Writes rendered text to one fixed path with atomic replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicWriter {
    path: PathBuf,
}

impl AtomicWriter {
    /// Creates a writer for `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Target path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the artifact with `text`.
    ///
    /// # Errors
    /// Returns [`WatchError::Write`] if any step fails. The previous artifact
    /// is left in place.
    pub fn write(&self, text: &str) -> Result<()> {
        write_atomic(&self.path, text.as_bytes()).map_err(|e| WatchError::write(&self.path, e))
    }

    /// Verifies that the artifact directory exists and accepts new files,
    /// and that nothing other than a regular file occupies the target path.
    ///
    /// # Errors
    /// Returns a configuration error otherwise.
    pub fn probe(&self) -> Result<()> {
        probe_dir(parent_dir(&self.path))?;
        match std::fs::metadata(&self.path) {
            Ok(metadata) if !metadata.is_file() => Err(WatchError::config(format!(
                "output path {} exists and is not a regular file",
                self.path.display()
            ))),
            _ => Ok(()),
        }
    }
}

/// Atomically replaces `path` with `contents`.
///
/// # Errors
/// Returns the first I/O error encountered.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let dir = parent_dir(path);

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.flush()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(ARTIFACT_MODE))?;
    }

    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;

    sync_dir(dir);
    Ok(())
}

/// Checks that `dir` is a directory in which files can be created.
///
/// # Errors
/// Returns a configuration error naming the directory.
pub fn probe_dir(dir: &Path) -> Result<()> {
    let metadata = std::fs::metadata(dir).map_err(|e| {
        WatchError::config(format!("output directory {}: {e}", dir.display()))
    })?;
    if !metadata.is_dir() {
        return Err(WatchError::config(format!(
            "output directory {} is not a directory",
            dir.display()
        )));
    }

    tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(".probe")
        .tempfile_in(dir)
        .map(drop)
        .map_err(|e| {
            WatchError::config(format!(
                "output directory {} is not writable: {e}",
                dir.display()
            ))
        })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Persists the rename itself. Failure only weakens crash durability, the
/// artifact is already consistent for readers.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = std::fs::File::open(dir).and_then(|d| d.sync_all()) {
        tracing::debug!(dir = %dir.display(), error = %e, "directory fsync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
