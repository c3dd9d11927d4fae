use common::{Error, Result};
use std::sync::Mutex;

use super::{PipelineState, StateStore};

/// In-memory state store with the same semantics as the file-backed one.
/// Used as a test double for the orchestrator.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<PipelineState>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<PipelineState> {
        self.state
            .lock()
            .map(|state| state.clone())
            .map_err(|_| Error::Other("state store mutex poisoned".to_string()))
    }

    fn save(&self, state: &PipelineState) -> Result<()> {
        let mut held = self
            .state
            .lock()
            .map_err(|_| Error::Other("state store mutex poisoned".to_string()))?;
        *held = state.clone();
        Ok(())
    }
}
