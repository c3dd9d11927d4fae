use common::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::{PipelineState, StateStore};

/// JSON file-backed state persistence. A missing or unreadable file is
/// treated as absence of prior history, never as a fatal error; saves are
/// atomic overwrites (temp file + rename in the target directory).
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<PipelineState> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "State file not found, starting empty");
            return Ok(PipelineState::default());
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "Failed to read state file, starting empty"
                );
                return Ok(PipelineState::default());
            }
        };

        match serde_json::from_str(&contents) {
            Ok(state) => {
                debug!(path = %self.path.display(), "Loaded pipeline state");
                Ok(state)
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "State file is corrupt, starting empty"
                );
                Ok(PipelineState::default())
            }
        }
    }

    fn save(&self, state: &PipelineState) -> Result<()> {
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        fs::create_dir_all(&parent)?;

        let json = serde_json::to_vec_pretty(state)?;

        // Stage in the same directory so the rename is atomic.
        let mut staged = NamedTempFile::new_in(&parent)?;
        staged.write_all(&json)?;
        staged
            .persist(&self.path)
            .map_err(|err| Error::Storage(format!("failed to persist state file: {}", err)))?;

        debug!(path = %self.path.display(), "Saved pipeline state");
        Ok(())
    }
}
