use chrono::{DateTime, Utc};
use common::config::Location;
use serde::Serialize;
use serde_json::Value;

/// The result of one location's full fetch attempt sequence. Produced
/// exactly once per location per run and never mutated afterwards.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(FetchSuccess),
    Failure(FetchFailure),
}

impl FetchOutcome {
    pub fn location(&self) -> &Location {
        match self {
            FetchOutcome::Success(success) => &success.location,
            FetchOutcome::Failure(failure) => &failure.location,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FetchSuccess {
    pub location: Location,
    pub data: Value,
    pub ingestion: IngestionMetadata,
    pub api: ApiMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchFailure {
    pub location: Location,
    pub error: String,
}

/// Client-side metadata captured around the API call.
#[derive(Debug, Clone)]
pub struct IngestionMetadata {
    pub fetched_at: DateTime<Utc>,
    pub request_url: String,
    pub elapsed_ms: f64,
    pub status_code: u16,
}

/// Top-level fields reported by the upstream API. Everything is optional:
/// a field the server omits becomes None, never a placeholder value.
#[derive(Debug, Clone, Default)]
pub struct ApiMetadata {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub elevation: Option<f64>,
    pub generationtime_ms: Option<f64>,
    pub timezone: Option<String>,
    pub utc_offset_seconds: Option<i64>,
}

impl ApiMetadata {
    pub fn from_payload(payload: &Value) -> Self {
        Self {
            latitude: payload.get("latitude").and_then(Value::as_f64),
            longitude: payload.get("longitude").and_then(Value::as_f64),
            elevation: payload.get("elevation").and_then(Value::as_f64),
            generationtime_ms: payload.get("generationtime_ms").and_then(Value::as_f64),
            timezone: payload
                .get("timezone")
                .and_then(Value::as_str)
                .map(str::to_string),
            utc_offset_seconds: payload.get("utc_offset_seconds").and_then(Value::as_i64),
        }
    }
}
