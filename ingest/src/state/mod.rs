mod json_store;
mod memory;

pub use json_store::JsonStateStore;
pub use memory::MemoryStateStore;

use chrono::{DateTime, Utc};
use common::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const STATE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStatus {
    Success,
    Failure,
    Partial,
}

/// Last-known fetch outcome for one (provider, interval, location) key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationFetchState {
    pub location_name: String,
    pub provider: String,
    pub interval: String,
    pub last_fetch_timestamp: DateTime<Utc>,
    pub last_fetch_status: FetchStatus,
    pub last_fetch_error: Option<String>,
    pub records_fetched: u64,
    pub forecast_end_date: Option<String>,
}

impl LocationFetchState {
    pub fn new(location_name: &str, provider: &str, interval: &str) -> Self {
        Self {
            location_name: location_name.to_string(),
            provider: provider.to_string(),
            interval: interval.to_string(),
            last_fetch_timestamp: Utc::now(),
            last_fetch_status: FetchStatus::Success,
            last_fetch_error: None,
            records_fetched: 0,
            forecast_end_date: None,
        }
    }

    pub fn mark_success(&mut self, records_fetched: u64, forecast_end_date: Option<String>) {
        self.last_fetch_timestamp = Utc::now();
        self.last_fetch_status = FetchStatus::Success;
        self.last_fetch_error = None;
        self.records_fetched = records_fetched;
        if forecast_end_date.is_some() {
            self.forecast_end_date = forecast_end_date;
        }
    }

    pub fn mark_failure(&mut self, error: &str) {
        self.last_fetch_timestamp = Utc::now();
        self.last_fetch_status = FetchStatus::Failure;
        self.last_fetch_error = Some(error.to_string());
        self.records_fetched = 0;
    }

    /// Advisory freshness check: last fetch succeeded and happened within
    /// the given recency window. Callers may use this to skip refetches;
    /// nothing in the store enforces it.
    pub fn is_fresh(&self, hours: i64) -> bool {
        if self.last_fetch_status != FetchStatus::Success {
            return false;
        }
        let elapsed = Utc::now() - self.last_fetch_timestamp;
        elapsed < chrono::Duration::hours(hours)
    }
}

pub fn state_key(provider: &str, interval: &str, location_name: &str) -> String {
    format!("{}:{}:{}", provider, interval, location_name)
}

/// Root state document tracking all locations across all providers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineState {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    pub locations: HashMap<String, LocationFetchState>,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION.to_string(),
            last_updated: Utc::now(),
            locations: HashMap::new(),
        }
    }
}

impl PipelineState {
    /// Gets or lazily creates the entry for a key. A fresh entry defaults
    /// to success with zero records and is not persisted until a caller
    /// mutates and saves.
    pub fn get_location(
        &mut self,
        location_name: &str,
        provider: &str,
        interval: &str,
    ) -> &mut LocationFetchState {
        let key = state_key(provider, interval, location_name);
        self.locations
            .entry(key)
            .or_insert_with(|| LocationFetchState::new(location_name, provider, interval))
    }

    pub fn update_last_modified(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Persistence contract for pipeline state. Every mutation persists before
/// the call returns; there is no write-behind buffering.
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<PipelineState>;

    fn save(&self, state: &PipelineState) -> Result<()>;

    fn get_location(
        &self,
        location_name: &str,
        provider: &str,
        interval: &str,
    ) -> Result<LocationFetchState> {
        let mut state = self.load()?;
        Ok(state.get_location(location_name, provider, interval).clone())
    }

    fn mark_fetch_success(
        &self,
        location_name: &str,
        provider: &str,
        interval: &str,
        records_fetched: u64,
        forecast_end_date: Option<String>,
    ) -> Result<()> {
        let mut state = self.load()?;
        state
            .get_location(location_name, provider, interval)
            .mark_success(records_fetched, forecast_end_date);
        state.update_last_modified();
        self.save(&state)
    }

    fn mark_fetch_failure(
        &self,
        location_name: &str,
        provider: &str,
        interval: &str,
        error: &str,
    ) -> Result<()> {
        let mut state = self.load()?;
        state
            .get_location(location_name, provider, interval)
            .mark_failure(error);
        state.update_last_modified();
        self.save(&state)
    }
}
