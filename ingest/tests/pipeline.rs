//! End-to-end orchestrator tests with a stubbed upstream source, the
//! in-memory state store, and an in-memory object store.

use async_trait::async_trait;
use chrono::Utc;
use common::config::{
    ApiConfig, Interval, Location, RetryConfig, Settings, StateConfig, StorageConfig,
};
use futures::TryStreamExt;
use object_store::ObjectStore;
use object_store::memory::InMemory;
use parquet::basic::Compression;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Notify;

use ingest::clients::{FetchError, ForecastSource};
use ingest::models::{ApiMetadata, FetchSuccess, IngestionMetadata};
use ingest::pipeline::Pipeline;
use ingest::state::{FetchStatus, MemoryStateStore, StateStore};
use ingest::utils::retry::Sleeper;
use ingest::writers::ParquetWriter;

/// Canned per-location responses.
struct ScriptedSource {
    responses: HashMap<String, Result<Value, FetchError>>,
}

impl ScriptedSource {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
        }
    }

    fn with_payload(mut self, name: &str, payload: Value) -> Self {
        self.responses.insert(name.to_string(), Ok(payload));
        self
    }

    fn with_error(mut self, name: &str, error: FetchError) -> Self {
        self.responses.insert(name.to_string(), Err(error));
        self
    }
}

#[async_trait]
impl ForecastSource for ScriptedSource {
    async fn fetch_for_location(
        &self,
        location: &Location,
    ) -> Result<FetchSuccess, FetchError> {
        match self.responses.get(&location.name) {
            Some(Ok(payload)) => Ok(FetchSuccess {
                location: location.clone(),
                data: payload.clone(),
                ingestion: IngestionMetadata {
                    fetched_at: Utc::now(),
                    request_url: "http://stub/forecast".to_string(),
                    elapsed_ms: 1.0,
                    status_code: 200,
                },
                api: ApiMetadata::from_payload(payload),
            }),
            Some(Err(err)) => Err(err.clone()),
            None => Err(FetchError::api("API error: unknown location")),
        }
    }
}

/// Fails twice with a timeout, then serves a payload.
struct FlakySource {
    attempts: AtomicU32,
}

#[async_trait]
impl ForecastSource for FlakySource {
    async fn fetch_for_location(
        &self,
        location: &Location,
    ) -> Result<FetchSuccess, FetchError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) < 2 {
            return Err(FetchError::timeout("request timed out"));
        }
        Ok(FetchSuccess {
            location: location.clone(),
            data: daily_payload(3),
            ingestion: IngestionMetadata {
                fetched_at: Utc::now(),
                request_url: "http://stub/forecast".to_string(),
                elapsed_ms: 1.0,
                status_code: 200,
            },
            api: ApiMetadata::default(),
        })
    }
}

/// Signals once a fetch is in flight, then never resolves.
struct PendingSource {
    started: Arc<Notify>,
}

#[async_trait]
impl ForecastSource for PendingSource {
    async fn fetch_for_location(
        &self,
        _location: &Location,
    ) -> Result<FetchSuccess, FetchError> {
        self.started.notify_one();
        std::future::pending().await
    }
}

/// Records requested delays without waiting.
#[derive(Default)]
struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

fn location(name: &str) -> Location {
    Location {
        name: name.to_string(),
        latitude: 50.0,
        longitude: 10.0,
    }
}

fn settings(names: &[&str], interval: Interval) -> Settings {
    Settings {
        provider: "open_meteo".to_string(),
        locations: names.iter().map(|n| location(n)).collect(),
        interval,
        api: ApiConfig::default(),
        // Zero base delay so transient retries run without wall-clock cost.
        retry: RetryConfig {
            max_attempts: 3,
            backoff_factor: 2.0,
            base_delay_ms: 0,
        },
        storage: StorageConfig::default(),
        state: StateConfig::default(),
    }
}

fn hourly_payload(hours: usize) -> Value {
    let times: Vec<String> = (0..hours)
        .map(|h| format!("2025-01-15T{:02}:00", h % 24))
        .collect();
    let temps: Vec<f64> = (0..hours).map(|h| h as f64 / 2.0).collect();
    json!({
        "latitude": 50.0,
        "longitude": 10.0,
        "hourly": { "time": times, "temperature_2m": temps }
    })
}

fn daily_payload(days: usize) -> Value {
    let times: Vec<String> = (0..days).map(|d| format!("2025-01-{:02}", 15 + d)).collect();
    json!({
        "daily": { "time": times, "temperature_2m_max": vec![5.0; days] }
    })
}

struct Harness {
    pipeline: Pipeline,
    state: Arc<MemoryStateStore>,
    store: Arc<InMemory>,
}

fn harness(settings: Settings, source: ScriptedSource) -> Harness {
    let state = Arc::new(MemoryStateStore::new());
    let store = Arc::new(InMemory::new());
    let writer = Arc::new(ParquetWriter::new(store.clone(), Compression::SNAPPY));
    let pipeline = Pipeline::new(settings, Arc::new(source), writer, state.clone());
    Harness {
        pipeline,
        state,
        store,
    }
}

async fn stored_object_count(store: &InMemory) -> usize {
    store
        .list(None)
        .try_collect::<Vec<_>>()
        .await
        .unwrap()
        .len()
}

#[tokio::test]
async fn all_fetches_failing_terminates_the_run_without_writes() {
    let source = ScriptedSource::new()
        .with_error("London", FetchError::timeout("request timed out"))
        .with_error("Tokyo", FetchError::api("API error: invalid coordinates"));

    let h = harness(settings(&["London", "Tokyo"], Interval::Daily), source);
    let result = h.pipeline.run().await.unwrap();

    assert!(!result.success);
    assert_eq!(result.records_processed, 0);
    assert_eq!(result.failed.len(), 2);
    assert!(result.files.is_empty());
    assert_eq!(result.error.as_deref(), Some("All locations failed to fetch data."));
    assert_eq!(stored_object_count(&h.store).await, 0);

    // Both failures were still recorded in the state store.
    let london = h
        .state
        .get_location("London", "open_meteo", "daily")
        .unwrap();
    assert_eq!(london.last_fetch_status, FetchStatus::Failure);
    assert_eq!(london.records_fetched, 0);
}

#[tokio::test]
async fn mixed_outcomes_write_partitions_and_report_failures() {
    let source = ScriptedSource::new()
        .with_payload("Berlin", hourly_payload(24))
        .with_error("Atlantis", FetchError::api("API error: not found"))
        .with_payload("Madrid", hourly_payload(24));

    let h = harness(
        settings(&["Berlin", "Atlantis", "Madrid"], Interval::Hourly),
        source,
    );
    let result = h.pipeline.run().await.unwrap();

    assert!(result.success);
    assert_eq!(result.records_processed, 48);
    assert_eq!(result.files.len(), 2);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].location.name, "Atlantis");

    assert!(result.files[0].path.starts_with("open_meteo/hourly/Berlin/"));
    assert!(result.files[1].path.starts_with("open_meteo/hourly/Madrid/"));
    assert!(result.files[0].path.ends_with(&format!("_{}.parquet", result.run_id)));
    assert_eq!(stored_object_count(&h.store).await, 2);

    let berlin = h
        .state
        .get_location("Berlin", "open_meteo", "hourly")
        .unwrap();
    assert_eq!(berlin.last_fetch_status, FetchStatus::Success);
    assert_eq!(berlin.records_fetched, 24);
    assert_eq!(berlin.forecast_end_date.as_deref(), Some("2025-01-15T23:00"));
}

#[tokio::test]
async fn daily_run_writes_canonical_per_day_files() {
    let source = ScriptedSource::new().with_payload("London", daily_payload(7));

    let h = harness(settings(&["London"], Interval::Daily), source);
    let result = h.pipeline.run().await.unwrap();

    assert!(result.success);
    assert_eq!(result.records_processed, 7);
    assert_eq!(result.files.len(), 1);
    // Daily file names carry only the calendar day, not the run id.
    assert!(result.files[0].path.starts_with("open_meteo/daily/London/"));
    assert!(!result.files[0].path.contains(&result.run_id));
    assert!(result.files[0].path.ends_with(".parquet"));
}

#[tokio::test]
async fn transform_failure_is_reported_but_fetch_state_stays_success() {
    // Fetch succeeds but the payload lacks the hourly time series, so the
    // transform fails for this location.
    let source = ScriptedSource::new()
        .with_payload("Berlin", hourly_payload(24))
        .with_payload("Broken", json!({ "hourly": { "temperature_2m": [1.0] } }));

    let h = harness(settings(&["Berlin", "Broken"], Interval::Hourly), source);
    let result = h.pipeline.run().await.unwrap();

    assert!(result.success);
    assert_eq!(result.records_processed, 24);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].location.name, "Broken");
    assert!(result.failed[0].error.contains("time array"));

    // Fetch state reflects fetch health, not transform health.
    let broken = h
        .state
        .get_location("Broken", "open_meteo", "hourly")
        .unwrap();
    assert_eq!(broken.last_fetch_status, FetchStatus::Success);
    assert!(broken.last_fetch_error.is_none());
}

#[tokio::test]
async fn transient_errors_are_retried_within_a_run() {
    let state = Arc::new(MemoryStateStore::new());
    let store = Arc::new(InMemory::new());
    let writer = Arc::new(ParquetWriter::new(store, Compression::SNAPPY));
    let source = Arc::new(FlakySource {
        attempts: AtomicU32::new(0),
    });

    let pipeline = Pipeline::new(
        settings(&["London"], Interval::Daily),
        source.clone(),
        writer,
        state,
    );
    let result = pipeline.run().await.unwrap();

    assert!(result.success);
    assert_eq!(result.records_processed, 3);
    assert_eq!(source.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn retry_delays_at_the_pipeline_level_follow_the_backoff_policy() {
    let state = Arc::new(MemoryStateStore::new());
    let store = Arc::new(InMemory::new());
    let writer = Arc::new(ParquetWriter::new(store, Compression::SNAPPY));
    let sleeper = Arc::new(RecordingSleeper::default());

    let mut settings = settings(&["London"], Interval::Daily);
    settings.retry = RetryConfig {
        max_attempts: 3,
        backoff_factor: 2.0,
        base_delay_ms: 100,
    };

    let pipeline = Pipeline::new(
        settings,
        Arc::new(FlakySource {
            attempts: AtomicU32::new(0),
        }),
        writer,
        state,
    )
    .with_sleeper(sleeper.clone());
    let result = pipeline.run().await.unwrap();

    assert!(result.success);
    assert_eq!(
        *sleeper.sleeps.lock().unwrap(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
}

#[tokio::test]
async fn aborting_a_run_mid_fetch_records_no_state() {
    let started = Arc::new(Notify::new());
    let state = Arc::new(MemoryStateStore::new());
    let store = Arc::new(InMemory::new());
    let writer = Arc::new(ParquetWriter::new(store.clone(), Compression::SNAPPY));
    let pipeline = Pipeline::new(
        settings(&["London", "Tokyo"], Interval::Hourly),
        Arc::new(PendingSource {
            started: started.clone(),
        }),
        writer,
        state.clone(),
    );

    let handle = tokio::spawn(async move { pipeline.run().await });
    started.notified().await;
    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    // The run never reached the recording phase, so nothing was persisted.
    assert!(state.load().unwrap().locations.is_empty());
    assert_eq!(stored_object_count(&store).await, 0);
}
