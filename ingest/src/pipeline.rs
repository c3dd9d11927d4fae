use chrono::Utc;
use common::Result;
use common::config::Settings;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use crate::clients::{ForecastSource, RetryingFetchClient};
use crate::models::{FetchFailure, FetchOutcome, RowBatch, RunResult};
use crate::state::StateStore;
use crate::transform;
use crate::utils::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::writers::ForecastWriter;

/// Coordinates one end-to-end run: fetch all locations, record every
/// outcome in the state store, transform successes, and commit the
/// concatenated rows as partitioned files.
pub struct Pipeline {
    settings: Settings,
    source: Arc<dyn ForecastSource>,
    writer: Arc<dyn ForecastWriter>,
    state_store: Arc<dyn StateStore>,
    sleeper: Arc<dyn Sleeper>,
}

impl Pipeline {
    pub fn new(
        settings: Settings,
        source: Arc<dyn ForecastSource>,
        writer: Arc<dyn ForecastWriter>,
        state_store: Arc<dyn StateStore>,
    ) -> Self {
        Self {
            settings,
            source,
            writer,
            state_store,
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub async fn run(&self) -> Result<RunResult> {
        let run_id = Uuid::new_v4().to_string();
        let run_start = Utc::now();
        let interval = self.settings.interval;
        let provider = self.settings.provider.as_str();

        let location_names: Vec<&str> = self
            .settings
            .locations
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        info!(
            run_id = %run_id,
            interval = %interval,
            locations = ?location_names,
            "Pipeline run started"
        );

        let client = RetryingFetchClient::new(
            self.source.clone(),
            self.settings.api.max_concurrent_requests,
            RetryPolicy::from_config(&self.settings.retry),
            self.sleeper.clone(),
        );

        // A cancelled fetch phase errors out here, before any state is
        // mutated; a run that did not happen records nothing.
        let outcomes = client.fetch_all(&self.settings.locations).await?;

        // Recording happens for every outcome regardless of downstream
        // transform success: state tracks fetch health, not transform health.
        for outcome in &outcomes {
            match outcome {
                FetchOutcome::Success(success) => {
                    self.state_store.mark_fetch_success(
                        &success.location.name,
                        provider,
                        interval.as_str(),
                        transform::record_count(success, interval),
                        transform::forecast_end_date(success, interval),
                    )?;
                }
                FetchOutcome::Failure(failure) => {
                    self.state_store.mark_fetch_failure(
                        &failure.location.name,
                        provider,
                        interval.as_str(),
                        &failure.error,
                    )?;
                }
            }
        }

        let mut combined: Option<RowBatch> = None;
        let mut failed: Vec<FetchFailure> = Vec::new();

        for outcome in &outcomes {
            match outcome {
                FetchOutcome::Failure(failure) => {
                    error!(
                        location = %failure.location.name,
                        error = %failure.error,
                        "Fetch failed"
                    );
                    failed.push(failure.clone());
                }
                FetchOutcome::Success(success) => {
                    match transform::transform(success, interval, provider, &run_id) {
                        Ok(batch) => {
                            info!(
                                location = %success.location.name,
                                records = batch.len(),
                                "Transformed location"
                            );
                            match combined.as_mut() {
                                Some(all) => all.extend(batch)?,
                                None => combined = Some(batch),
                            }
                        }
                        Err(err) => {
                            // The fetch itself succeeded, so the recorded
                            // fetch-state stays success; the failure is
                            // surfaced in the run result instead.
                            error!(
                                location = %success.location.name,
                                error = %err,
                                "Transform failed"
                            );
                            failed.push(FetchFailure {
                                location: success.location.clone(),
                                error: err.to_string(),
                            });
                        }
                    }
                }
            }
        }

        let Some(all_rows) = combined else {
            error!("No data fetched successfully, terminating run");
            return Ok(RunResult {
                success: false,
                run_id,
                run_start,
                run_end: Utc::now(),
                records_processed: 0,
                files: Vec::new(),
                failed,
                error: Some("All locations failed to fetch data.".to_string()),
            });
        };

        let files = self
            .writer
            .write_partitioned(all_rows, interval, provider, &run_id)
            .await?;
        let records_processed = files.iter().map(|f| f.records_written).sum();
        let run_end = Utc::now();

        let result = RunResult {
            success: true,
            run_id,
            run_start,
            run_end,
            records_processed,
            files,
            failed,
            error: None,
        };

        info!(
            run_id = %result.run_id,
            duration_s = result.duration_seconds(),
            records = result.records_processed,
            files = result.files.len(),
            failed = result.failed.len(),
            "Pipeline run complete"
        );

        Ok(result)
    }
}
