//! Per-request scratch directories.

use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "repo-";

/// A uniquely-named directory owned by exactly one request.
///
/// The directory is removed by [`Workspace::release`] or, if that is never
/// called (early return, dropped future), when the workspace is dropped.
/// Removal failures are logged and otherwise ignored.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    dir: Option<TempDir>,
}

impl Workspace {
    /// Creates a workspace under the system temp directory.
    pub fn acquire() -> io::Result<Self> {
        Self::acquire_in(std::env::temp_dir())
    }

    /// Creates a workspace under `root`.
    pub fn acquire_in(root: impl AsRef<Path>) -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)?;

        Ok(Self {
            path: dir.path().to_path_buf(),
            dir: Some(dir),
        })
    }

    /// Returns the workspace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the workspace.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Workspace removed"),
            Err(e) => tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
