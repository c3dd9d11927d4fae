//! Pure mapping from raw fetch payloads to normalized row sets.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use common::config::Interval;
use common::{Error, Result};
use serde_json::Value;

use crate::models::{DailyRow, FetchSuccess, HourlyRow, RowBatch};

/// Transforms one successful fetch into normalized rows for the configured
/// interval. A missing time series is a hard error for this location only.
pub fn transform(
    result: &FetchSuccess,
    interval: Interval,
    provider: &str,
    run_id: &str,
) -> Result<RowBatch> {
    match interval {
        Interval::Hourly => Ok(RowBatch::Hourly(transform_hourly(result, provider, run_id)?)),
        Interval::Daily => Ok(RowBatch::Daily(transform_daily(result, provider, run_id)?)),
    }
}

pub fn transform_hourly(
    result: &FetchSuccess,
    provider: &str,
    run_id: &str,
) -> Result<Vec<HourlyRow>> {
    let name = &result.location.name;
    let section = interval_section(result, Interval::Hourly)?;
    let times = time_array(section, name, Interval::Hourly)?;
    let len = times.len();

    // Each series is looked up independently: a missing field yields null
    // for every row without blocking extraction of the others.
    let temperature_2m = float_series(section, "temperature_2m", len);
    let precipitation = float_series(section, "precipitation", len);
    let relative_humidity_2m = float_series(section, "relative_humidity_2m", len);
    let windspeed_10m = float_series(section, "windspeed_10m", len);
    let wind_direction_10m = float_series(section, "wind_direction_10m", len);
    let cloud_cover = float_series(section, "cloudcover", len);
    let weather_code = int_series(section, "weathercode", len);

    let ingestion_timestamp = result.ingestion.fetched_at.naive_utc();
    let mut rows = Vec::with_capacity(len);

    for (i, raw) in times.iter().enumerate() {
        let raw = raw.as_str().ok_or_else(|| {
            Error::Transform(format!("non-string time value in payload for '{}'", name))
        })?;
        rows.push(HourlyRow {
            location_name: name.clone(),
            requested_latitude: result.location.latitude,
            requested_longitude: result.location.longitude,
            api_latitude: result.api.latitude,
            api_longitude: result.api.longitude,
            timestamp: parse_naive_datetime(raw, name)?,
            temperature_2m: temperature_2m[i],
            precipitation: precipitation[i],
            relative_humidity_2m: relative_humidity_2m[i],
            windspeed_10m: windspeed_10m[i],
            wind_direction_10m: wind_direction_10m[i],
            cloud_cover: cloud_cover[i],
            weather_code: weather_code[i],
            source_provider: provider.to_string(),
            ingestion_timestamp,
            run_id: run_id.to_string(),
        });
    }

    Ok(rows)
}

pub fn transform_daily(
    result: &FetchSuccess,
    provider: &str,
    run_id: &str,
) -> Result<Vec<DailyRow>> {
    let name = &result.location.name;
    let section = interval_section(result, Interval::Daily)?;
    let times = time_array(section, name, Interval::Daily)?;
    let len = times.len();

    let temperature_2m_max = float_series(section, "temperature_2m_max", len);
    let temperature_2m_min = float_series(section, "temperature_2m_min", len);
    let precipitation_sum = float_series(section, "precipitation_sum", len);

    let ingestion_timestamp = result.ingestion.fetched_at.naive_utc();
    let mut rows = Vec::with_capacity(len);

    for (i, raw) in times.iter().enumerate() {
        let raw = raw.as_str().ok_or_else(|| {
            Error::Transform(format!("non-string time value in payload for '{}'", name))
        })?;
        rows.push(DailyRow {
            location_name: name.clone(),
            requested_latitude: result.location.latitude,
            requested_longitude: result.location.longitude,
            api_latitude: result.api.latitude,
            api_longitude: result.api.longitude,
            date: parse_naive_date(raw, name)?,
            temperature_2m_max: temperature_2m_max[i],
            temperature_2m_min: temperature_2m_min[i],
            precipitation_sum: precipitation_sum[i],
            source_provider: provider.to_string(),
            ingestion_timestamp,
            run_id: run_id.to_string(),
        });
    }

    Ok(rows)
}

/// Length of the interval's time series, 0 when absent. Used by the
/// orchestrator's recording phase, which must not fail on a bad payload.
pub fn record_count(result: &FetchSuccess, interval: Interval) -> u64 {
    result
        .data
        .get(interval.as_str())
        .and_then(|section| section.get("time"))
        .and_then(Value::as_array)
        .map(|times| times.len() as u64)
        .unwrap_or(0)
}

/// Last value of the interval's time series, verbatim.
pub fn forecast_end_date(result: &FetchSuccess, interval: Interval) -> Option<String> {
    result
        .data
        .get(interval.as_str())
        .and_then(|section| section.get("time"))
        .and_then(Value::as_array)
        .and_then(|times| times.last())
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn interval_section(result: &FetchSuccess, interval: Interval) -> Result<&Value> {
    result.data.get(interval.as_str()).ok_or_else(|| {
        Error::Transform(format!(
            "payload for '{}' has no '{}' section",
            result.location.name,
            interval.as_str()
        ))
    })
}

fn time_array<'a>(section: &'a Value, name: &str, interval: Interval) -> Result<&'a Vec<Value>> {
    section
        .get("time")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            Error::Transform(format!(
                "payload for '{}' has no '{}' time array",
                name,
                interval.as_str()
            ))
        })
}

fn float_series(section: &Value, field: &str, len: usize) -> Vec<Option<f64>> {
    match section.get(field).and_then(Value::as_array) {
        Some(values) => (0..len)
            .map(|i| values.get(i).and_then(Value::as_f64))
            .collect(),
        None => vec![None; len],
    }
}

fn int_series(section: &Value, field: &str, len: usize) -> Vec<Option<i64>> {
    match section.get(field).and_then(Value::as_array) {
        Some(values) => (0..len)
            .map(|i| values.get(i).and_then(Value::as_i64))
            .collect(),
        None => vec![None; len],
    }
}

/// Open-Meteo reports local times as `2025-01-15T14:00`; RFC 3339 values
/// are accepted too and normalized to a timezone-naive form so the row
/// format and the parquet encoder never disagree on representation.
fn parse_naive_datetime(raw: &str, name: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.naive_utc()))
        .map_err(|err| {
            Error::Transform(format!(
                "unparseable timestamp '{}' for '{}': {}",
                raw, name, err
            ))
        })
}

fn parse_naive_date(raw: &str, name: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|err| {
        Error::Transform(format!("unparseable date '{}' for '{}': {}", raw, name, err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiMetadata, IngestionMetadata};
    use chrono::Utc;
    use common::config::Location;
    use serde_json::json;

    fn success(data: Value) -> FetchSuccess {
        FetchSuccess {
            location: Location {
                name: "London".to_string(),
                latitude: 51.5074,
                longitude: -0.1278,
            },
            api: ApiMetadata {
                latitude: Some(51.5),
                longitude: Some(-0.13),
                ..ApiMetadata::default()
            },
            ingestion: IngestionMetadata {
                fetched_at: Utc::now(),
                request_url: "http://test".to_string(),
                elapsed_ms: 1.0,
                status_code: 200,
            },
            data,
        }
    }

    fn hourly_payload() -> Value {
        json!({
            "hourly": {
                "time": ["2025-01-15T00:00", "2025-01-15T01:00", "2025-01-15T02:00"],
                "temperature_2m": [1.5, 2.0, null],
                "weathercode": [3, 61, 0]
            }
        })
    }

    #[test]
    fn row_count_matches_time_array_length() {
        let rows = transform_hourly(&success(hourly_payload()), "open_meteo", "run1").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].run_id, "run1");
        assert_eq!(rows[0].location_name, "London");
    }

    #[test]
    fn missing_field_yields_null_without_affecting_others() {
        let rows = transform_hourly(&success(hourly_payload()), "open_meteo", "run1").unwrap();

        // precipitation is absent from the payload entirely
        assert!(rows.iter().all(|r| r.precipitation.is_none()));
        // temperature is present, with a per-index null
        assert_eq!(rows[0].temperature_2m, Some(1.5));
        assert_eq!(rows[1].temperature_2m, Some(2.0));
        assert!(rows[2].temperature_2m.is_none());
        assert_eq!(rows[1].weather_code, Some(61));
    }

    #[test]
    fn missing_time_array_is_a_transform_error() {
        let payload = json!({ "hourly": { "temperature_2m": [1.0] } });
        let err = transform_hourly(&success(payload), "open_meteo", "run1").unwrap_err();
        assert!(err.to_string().contains("time array"));

        let payload = json!({ "daily": {} });
        assert!(transform(&success(payload), Interval::Hourly, "open_meteo", "run1").is_err());
    }

    #[test]
    fn timestamps_are_normalized_to_naive() {
        let payload = json!({
            "hourly": {
                "time": ["2025-01-15T14:00", "2025-01-15T15:00:00+00:00"]
            }
        });
        let rows = transform_hourly(&success(payload), "open_meteo", "run1").unwrap();
        assert_eq!(rows[0].timestamp.to_string(), "2025-01-15 14:00:00");
        assert_eq!(rows[1].timestamp.to_string(), "2025-01-15 15:00:00");
    }

    #[test]
    fn daily_rows_carry_dates_and_measurements() {
        let payload = json!({
            "daily": {
                "time": ["2025-01-15", "2025-01-16"],
                "temperature_2m_max": [5.1, 6.2],
                "precipitation_sum": [0.0, 1.4]
            }
        });
        let rows = transform_daily(&success(payload), "open_meteo", "run1").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date.to_string(), "2025-01-15");
        assert_eq!(rows[1].temperature_2m_max, Some(6.2));
        assert_eq!(rows[1].precipitation_sum, Some(1.4));
        assert!(rows[0].temperature_2m_min.is_none());
        assert_eq!(rows[0].api_latitude, Some(51.5));
    }

    #[test]
    fn record_count_and_end_date_tolerate_bad_payloads() {
        let ok = success(hourly_payload());
        assert_eq!(record_count(&ok, Interval::Hourly), 3);
        assert_eq!(
            forecast_end_date(&ok, Interval::Hourly).as_deref(),
            Some("2025-01-15T02:00")
        );

        let bad = success(json!({}));
        assert_eq!(record_count(&bad, Interval::Hourly), 0);
        assert!(forecast_end_date(&bad, Interval::Daily).is_none());
    }
}
