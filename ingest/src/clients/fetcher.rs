use common::config::Location;
use common::{Error, Result};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

use super::ForecastSource;
use crate::models::{FetchFailure, FetchOutcome};
use crate::utils::retry::{RetryPolicy, Sleeper, retry_with_backoff};

/// Concurrency-bounded, retrying fetch orchestrator. Produces exactly one
/// outcome per location, in input order, with at most `max_concurrent`
/// retry sequences in flight at once. The permit covers the entire retry
/// loop, backoff sleeps included, so upstream load stays predictable.
pub struct RetryingFetchClient {
    source: Arc<dyn ForecastSource>,
    semaphore: Arc<Semaphore>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RetryingFetchClient {
    pub fn new(
        source: Arc<dyn ForecastSource>,
        max_concurrent: usize,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            source,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            policy,
            sleeper,
        }
    }

    /// Fetches all locations. Per-location failures are returned as data;
    /// only failure to populate the outcome set (cancellation) is an `Err`.
    pub async fn fetch_all(&self, locations: &[Location]) -> Result<Vec<FetchOutcome>> {
        let fetches = locations.iter().map(|location| self.fetch_one(location));
        join_all(fetches).await.into_iter().collect()
    }

    async fn fetch_one(&self, location: &Location) -> Result<FetchOutcome> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| Error::Other("fetch cancelled: semaphore closed".to_string()))?;

        let attempt = retry_with_backoff(&self.policy, self.sleeper.as_ref(), || {
            self.source.fetch_for_location(location)
        })
        .await;

        match attempt {
            Ok(success) => Ok(FetchOutcome::Success(success)),
            Err(err) => {
                warn!(location = %location.name, error = %err, "Fetch failed permanently");
                Ok(FetchOutcome::Failure(FetchFailure {
                    location: location.clone(),
                    error: err.to_string(),
                }))
            }
        }
    }
}
