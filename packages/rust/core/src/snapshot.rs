//! Sinks for intermediate answer snapshots.
//!
//! The pipeline hands each post-expansion answer to a [`SnapshotSink`] for
//! post-hoc inspection. Snapshots are never part of the pipeline's result.

use std::path::PathBuf;

use aragorn_shared::{AragornError, JsonMap, Result};
use tracing::debug;

/// Receives intermediate answers keyed by a fixed snapshot name.
pub trait SnapshotSink: Send + Sync {
    /// Persist one answer. `name` is a bare stem such as `omni_answer`.
    fn write(&self, name: &str, answer: &JsonMap) -> Result<()>;
}

/// Discards every snapshot.
pub struct NoSnapshots;

impl SnapshotSink for NoSnapshots {
    fn write(&self, _name: &str, _answer: &JsonMap) -> Result<()> {
        Ok(())
    }
}

/// Writes `<dir>/<name>.json` as pretty-printed JSON, overwriting each run.
///
/// Two runs sharing a directory will race on the same files.
#[derive(Debug, Clone)]
pub struct DirectorySnapshots {
    dir: PathBuf,
}

impl DirectorySnapshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Full path a snapshot with this name is written to.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl SnapshotSink for DirectorySnapshots {
    fn write(&self, name: &str, answer: &JsonMap) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| AragornError::io(&self.dir, e))?;

        let path = self.path_for(name);
        let content = serde_json::to_string_pretty(answer)
            .map_err(|e| AragornError::validation(format!("failed to serialize {name}: {e}")))?;

        std::fs::write(&path, content).map_err(|e| AragornError::io(&path, e))?;
        debug!(path = %path.display(), "wrote snapshot");
        Ok(())
    }
}
