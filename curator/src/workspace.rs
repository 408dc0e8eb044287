//! Per-request transient workspaces.
//!
//! Each generation request gets its own directory holding the staged signals
//! and the location the pipeline must write its memo to. Nothing in a
//! workspace outlives the request.

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::GenerationError;

pub const WORKSPACE_PREFIX: &str = "curator-";
pub const STAGED_INPUT_FILE: &str = "signals.json";
pub const EXPECTED_OUTPUT_FILE: &str = "memo.md";

/// Allocates workspaces under a fixed root directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,
    prefix: String,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: WORKSPACE_PREFIX.to_string(),
        }
    }

    /// Create a fresh, uniquely-named workspace directory.
    ///
    /// Names are `<prefix><uuid v4>` and the directory is created with
    /// `create_dir`, so an (unlikely) name collision fails instead of two
    /// requests sharing a directory.
    pub async fn create(&self) -> Result<Workspace, GenerationError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            GenerationError::workspace(format!("create root {}", self.root.display()), e)
        })?;

        let path = self.root.join(format!("{}{}", self.prefix, Uuid::new_v4()));
        tokio::fs::create_dir(&path)
            .await
            .map_err(|e| GenerationError::workspace(format!("create {}", path.display()), e))?;

        debug!(workspace = %path.display(), "workspace created");
        Ok(Workspace {
            path,
            released: false,
        })
    }
}

/// A single request's directory. Call [`Workspace::destroy`] when done; a
/// workspace dropped without it (e.g. a cancelled request) is removed
/// synchronously from `Drop`.
#[derive(Debug)]
pub struct Workspace {
    path: PathBuf,
    released: bool,
}

impl Workspace {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn staged_input_path(&self) -> PathBuf {
        self.path.join(STAGED_INPUT_FILE)
    }

    pub fn expected_output_path(&self) -> PathBuf {
        self.path.join(EXPECTED_OUTPUT_FILE)
    }

    /// Write the signal array as pretty-printed JSON to the staged-input path.
    pub async fn stage_signals(&self, signals: &[Value]) -> Result<PathBuf, GenerationError> {
        let path = self.staged_input_path();
        let bytes = serde_json::to_vec_pretty(signals)
            .map_err(|e| GenerationError::workspace("serialize signals", e.into()))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| GenerationError::workspace(format!("write {}", path.display()), e))?;
        Ok(path)
    }

    /// Best-effort recursive removal. Failures are logged, never returned.
    pub async fn destroy(mut self) {
        self.released = true;
        match tokio::fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(workspace = %self.path.display(), "workspace removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(workspace = %self.path.display(), "workspace already gone")
            }
            Err(e) => warn!(
                workspace = %self.path.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(workspace = %self.path.display(), "workspace dropped without destroy; removing");
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(workspace = %self.path.display(), error = %e, "failed to remove workspace");
            }
        }
    }
}
