use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub locations: Vec<Location>,
    pub interval: Interval,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub state: StateConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Location {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// Temporal granularity of a run. Selects both the API query shape and
/// the transform/partition-naming variant.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hourly,
    Daily,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default)]
    pub hourly_params: Vec<String>,
    #[serde(default)]
    pub daily_params: Vec<String>,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
    #[serde(default = "default_compression")]
    pub compression: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StateConfig {
    #[serde(default = "default_state_path")]
    pub path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            max_concurrent_requests: default_max_concurrent_requests(),
            hourly_params: Vec::new(),
            daily_params: Vec::new(),
            forecast_days: default_forecast_days(),
            timezone: default_timezone(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_factor: default_backoff_factor(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
            compression: default_compression(),
        }
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: default_state_path(),
        }
    }
}

fn default_provider() -> String {
    "open_meteo".to_string()
}

fn default_base_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    5
}

fn default_forecast_days() -> u32 {
    7
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_base_path() -> String {
    "data/weather".to_string()
}

fn default_compression() -> String {
    "snappy".to_string()
}

fn default_state_path() -> String {
    "data/pipeline_state.json".to_string()
}

impl Settings {
    pub fn new(path: &str) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("APP"));

        // Build the configuration
        let config = builder.build()?;

        // Try to deserialize the entire configuration
        let settings: Settings = config.try_deserialize()?;

        debug!(
            locations = settings.locations.len(),
            interval = %settings.interval,
            "Parsed pipeline settings"
        );

        Ok(settings)
    }

    /// Checks the constraints the rest of the pipeline assumes already hold.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.locations.is_empty() {
            return Err(ConfigError::Message(
                "at least one location must be configured".to_string(),
            ));
        }
        for location in &self.locations {
            if !(-90.0..=90.0).contains(&location.latitude) {
                return Err(ConfigError::Message(format!(
                    "location '{}' has latitude {} outside [-90, 90]",
                    location.name, location.latitude
                )));
            }
            if !(-180.0..=180.0).contains(&location.longitude) {
                return Err(ConfigError::Message(format!(
                    "location '{}' has longitude {} outside [-180, 180]",
                    location.name, location.longitude
                )));
            }
        }
        if !(1..=16).contains(&self.api.forecast_days) {
            return Err(ConfigError::Message(format!(
                "forecast_days {} outside [1, 16]",
                self.api.forecast_days
            )));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
