use async_trait::async_trait;
use chrono::Utc;
use common::config::{Interval, Location, Settings};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;

use super::{FetchError, ForecastSource};
use crate::models::{ApiMetadata, FetchSuccess, IngestionMetadata};

/// Client for the Open-Meteo forecast API.
pub struct OpenMeteoClient {
    client: rquest::Client,
    base_url: String,
    interval: Interval,
    hourly_params: Vec<String>,
    daily_params: Vec<String>,
    forecast_days: u32,
    timezone: String,
}

impl OpenMeteoClient {
    pub fn new(settings: &Settings) -> common::Result<Self> {
        let client = rquest::Client::builder()
            .timeout(Duration::from_secs(settings.api.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.api.base_url.clone(),
            interval: settings.interval,
            hourly_params: settings.api.hourly_params.clone(),
            daily_params: settings.api.daily_params.clone(),
            forecast_days: settings.api.forecast_days,
            timezone: settings.api.timezone.clone(),
        })
    }

    fn build_params(&self, location: &Location) -> Vec<(String, String)> {
        let mut params = vec![
            ("latitude".to_string(), location.latitude.to_string()),
            ("longitude".to_string(), location.longitude.to_string()),
            ("forecast_days".to_string(), self.forecast_days.to_string()),
            ("timezone".to_string(), self.timezone.clone()),
        ];

        match self.interval {
            Interval::Hourly if !self.hourly_params.is_empty() => {
                params.push(("hourly".to_string(), self.hourly_params.join(",")));
            }
            Interval::Daily if !self.daily_params.is_empty() => {
                params.push(("daily".to_string(), self.daily_params.join(",")));
            }
            _ => {}
        }

        params
    }

    fn classify(err: rquest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::timeout(format!("request timed out: {}", err))
        } else if err.is_connect() {
            FetchError::connect(format!("connection failed: {}", err))
        } else if err.is_decode() {
            FetchError::malformed(format!("malformed response: {}", err))
        } else {
            FetchError::io(format!("request I/O error: {}", err))
        }
    }
}

#[async_trait]
impl ForecastSource for OpenMeteoClient {
    async fn fetch_for_location(
        &self,
        location: &Location,
    ) -> std::result::Result<FetchSuccess, FetchError> {
        let params = self.build_params(location);
        let fetched_at = Utc::now();
        let started = Instant::now();

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(Self::classify)?;

        let status_code = response.status().as_u16();
        let request_url = response.url().to_string();

        if !response.status().is_success() {
            return Err(FetchError::status(status_code));
        }

        let payload: Value = response.json().await.map_err(Self::classify)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        // An `error` field marks a permanent API-level error.
        if payload
            .get("error")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            let reason = payload
                .get("reason")
                .and_then(Value::as_str)
                .unwrap_or("unknown reason");
            return Err(FetchError::api(format!("API error: {}", reason)));
        }

        debug!(
            location = %location.name,
            elapsed_ms,
            status_code,
            "Fetched forecast payload"
        );

        Ok(FetchSuccess {
            location: location.clone(),
            api: ApiMetadata::from_payload(&payload),
            data: payload,
            ingestion: IngestionMetadata {
                fetched_at,
                request_url,
                elapsed_ms,
                status_code,
            },
        })
    }
}
