use chrono::{DateTime, Utc};
use serde::Serialize;

use super::FetchFailure;

/// One partition actually written to storage.
#[derive(Debug, Clone, Serialize)]
pub struct WriteResult {
    pub path: String,
    pub records_written: usize,
    pub format: String,
}

/// Structured summary of one end-to-end run. Partial failure is reported
/// here as data; only a whole-run failure flips `success` off.
#[derive(Debug, Serialize)]
pub struct RunResult {
    pub success: bool,
    pub run_id: String,
    pub run_start: DateTime<Utc>,
    pub run_end: DateTime<Utc>,
    pub records_processed: usize,
    pub files: Vec<WriteResult>,
    pub failed: Vec<FetchFailure>,
    pub error: Option<String>,
}

impl RunResult {
    pub fn duration_seconds(&self) -> f64 {
        (self.run_end - self.run_start).num_milliseconds() as f64 / 1000.0
    }
}
