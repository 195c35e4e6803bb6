//! Request-scoped scratch directories for local compilation.

use crate::error::ExecError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Reject anything that is not a plain file name: empty, `.`/`..`, path
/// separators, NUL. Must be called before anything is written.
pub fn check_name(kind: &str, name: &str) -> Result<(), ExecError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(ExecError::invalid(format!("invalid {} name `{}`", kind, name)));
    }
    Ok(())
}

/// Uniquely named directory, removed exactly once: by `remove` on the
/// normal path, or on drop if the request is cancelled or unwinds.
/// Removal failures are only logged.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    removed: bool,
}

impl Workspace {
    pub async fn create(sandbox_root: &Path) -> io::Result<Self> {
        let root = sandbox_root.join(format!("run-{}", uuid::Uuid::new_v4()));
        let dir = root.clone();
        tokio::task::spawn_blocking(move || fs::create_dir_all(&dir))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))??;
        debug!(path = ?root, "Workspace created");
        Ok(Self {
            root,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Write `content` as `<workspace>/<name>`. `name` must already have
    /// passed `check_name`.
    pub async fn write(&self, name: &str, content: &[u8]) -> io::Result<PathBuf> {
        let path = self.root.join(name);
        tokio::fs::write(&path, content).await?;
        Ok(path)
    }

    /// Delete the directory tree off the async worker threads.
    pub async fn remove(mut self) {
        self.removed = true;
        let root = self.root.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || remove_tree(&root)).await {
            warn!(path = ?self.root, error = %e, "Workspace removal task failed");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.removed {
            remove_tree(&self.root);
        }
    }
}

fn remove_tree(root: &Path) {
    match fs::remove_dir_all(root) {
        Ok(()) => debug!(path = ?root, "Workspace removed"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = ?root, error = %e, "Failed to remove workspace"),
    }
}
