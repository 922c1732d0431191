//! Working directory management for a splice run.
//!
//! A [`Workspace`] is the one directory that holds every extracted segment
//! and the transient concat manifest. It is either a temporary directory
//! owned by the workspace (removed on drop, including during unwinding) or a
//! caller-supplied directory that is left in place.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::{Error, Result};

enum WorkDir {
    Temp(TempDir),
    Existing(PathBuf),
}

/// Working directory for segment files.
///
/// # Example
///
/// ```no_run
/// use clipsplice_av::Workspace;
///
/// let workspace = Workspace::temp_in(".")?;
/// let first = workspace.segment_path(0, "mp4");
/// // ... extract into `first` ...
/// // The directory and everything in it is removed when `workspace` drops.
/// # Ok::<(), clipsplice_av::Error>(())
/// ```
pub struct Workspace {
    dir: WorkDir,
}

impl Workspace {
    /// Create a fresh `clipsplice-XXXXXX` temporary directory under `parent`.
    pub fn temp_in<P: AsRef<Path>>(parent: P) -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("clipsplice-")
            .tempdir_in(parent.as_ref())
            .map_err(|e| {
                Error::InvalidInput(format!(
                    "failed to create temp dir in {}: {e}",
                    parent.as_ref().display()
                ))
            })?;

        tracing::debug!("created workspace {}", temp_dir.path().display());
        Ok(Self {
            dir: WorkDir::Temp(temp_dir),
        })
    }

    /// Use a caller-supplied directory, creating it if needed.
    ///
    /// The directory is never deleted by the workspace.
    pub fn existing<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: WorkDir::Existing(dir.to_path_buf()),
        })
    }

    /// Path to the working directory.
    pub fn path(&self) -> &Path {
        match &self.dir {
            WorkDir::Temp(t) => t.path(),
            WorkDir::Existing(p) => p,
        }
    }

    /// Whether the directory is removed when the workspace drops.
    pub fn is_temporary(&self) -> bool {
        matches!(self.dir, WorkDir::Temp(_))
    }

    /// Destination for the segment extracted for input position `index`.
    pub fn segment_path(&self, index: usize, extension: &str) -> PathBuf {
        segment_path(self.path(), index, extension)
    }

    /// Keep the directory on disk and return its path.
    pub fn keep(self) -> PathBuf {
        match self.dir {
            WorkDir::Temp(t) => t.keep(),
            WorkDir::Existing(p) => p,
        }
    }
}

/// `<dir>/segment_<index>.<extension>`, index zero padded to four digits.
pub fn segment_path(dir: &Path, index: usize, extension: &str) -> PathBuf {
    dir.join(format!("segment_{index:04}.{extension}"))
}
