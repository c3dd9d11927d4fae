//! Arrow schemas for the normalized row shapes and the row-to-batch
//! conversion handed to the parquet encoder.

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{NaiveDate, NaiveDateTime};
use common::Result;
use std::sync::Arc;

use crate::models::{DailyRow, HourlyRow, RowBatch};

fn naive_timestamp() -> DataType {
    // No timezone: rows are normalized to timezone-naive before writing.
    DataType::Timestamp(TimeUnit::Microsecond, None)
}

pub fn hourly_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("location_name", DataType::Utf8, false),
        Field::new("requested_latitude", DataType::Float64, false),
        Field::new("requested_longitude", DataType::Float64, false),
        Field::new("api_latitude", DataType::Float64, true),
        Field::new("api_longitude", DataType::Float64, true),
        Field::new("timestamp", naive_timestamp(), false),
        Field::new("temperature_2m", DataType::Float64, true),
        Field::new("precipitation", DataType::Float64, true),
        Field::new("relative_humidity_2m", DataType::Float64, true),
        Field::new("windspeed_10m", DataType::Float64, true),
        Field::new("wind_direction_10m", DataType::Float64, true),
        Field::new("cloud_cover", DataType::Float64, true),
        Field::new("weather_code", DataType::Int64, true),
        Field::new("source_provider", DataType::Utf8, false),
        Field::new("ingestion_timestamp", naive_timestamp(), false),
        Field::new("run_id", DataType::Utf8, false),
    ]))
}

pub fn daily_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new("location_name", DataType::Utf8, false),
        Field::new("requested_latitude", DataType::Float64, false),
        Field::new("requested_longitude", DataType::Float64, false),
        Field::new("api_latitude", DataType::Float64, true),
        Field::new("api_longitude", DataType::Float64, true),
        Field::new("date", DataType::Date32, false),
        Field::new("temperature_2m_max", DataType::Float64, true),
        Field::new("temperature_2m_min", DataType::Float64, true),
        Field::new("precipitation_sum", DataType::Float64, true),
        Field::new("source_provider", DataType::Utf8, false),
        Field::new("ingestion_timestamp", naive_timestamp(), false),
        Field::new("run_id", DataType::Utf8, false),
    ]))
}

pub fn to_record_batch(batch: &RowBatch) -> Result<RecordBatch> {
    match batch {
        RowBatch::Hourly(rows) => hourly_record_batch(rows),
        RowBatch::Daily(rows) => daily_record_batch(rows),
    }
}

fn micros(ts: &NaiveDateTime) -> i64 {
    ts.and_utc().timestamp_micros()
}

fn epoch_days(date: &NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid epoch");
    date.signed_duration_since(epoch).num_days() as i32
}

fn hourly_record_batch(rows: &[HourlyRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.location_name.as_str()),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.requested_latitude),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.requested_longitude),
        )),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.api_latitude))),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.api_longitude),
        )),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| micros(&r.timestamp)),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.temperature_2m),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.precipitation),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.relative_humidity_2m),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.windspeed_10m),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.wind_direction_10m),
        )),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.cloud_cover))),
        Arc::new(Int64Array::from_iter(rows.iter().map(|r| r.weather_code))),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.source_provider.as_str()),
        )),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| micros(&r.ingestion_timestamp)),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.run_id.as_str()),
        )),
    ];

    Ok(RecordBatch::try_new(hourly_schema(), columns)?)
}

fn daily_record_batch(rows: &[DailyRow]) -> Result<RecordBatch> {
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.location_name.as_str()),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.requested_latitude),
        )),
        Arc::new(Float64Array::from_iter_values(
            rows.iter().map(|r| r.requested_longitude),
        )),
        Arc::new(Float64Array::from_iter(rows.iter().map(|r| r.api_latitude))),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.api_longitude),
        )),
        Arc::new(Date32Array::from_iter_values(
            rows.iter().map(|r| epoch_days(&r.date)),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.temperature_2m_max),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.temperature_2m_min),
        )),
        Arc::new(Float64Array::from_iter(
            rows.iter().map(|r| r.precipitation_sum),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.source_provider.as_str()),
        )),
        Arc::new(TimestampMicrosecondArray::from_iter_values(
            rows.iter().map(|r| micros(&r.ingestion_timestamp)),
        )),
        Arc::new(StringArray::from_iter_values(
            rows.iter().map(|r| r.run_id.as_str()),
        )),
    ];

    Ok(RecordBatch::try_new(daily_schema(), columns)?)
}
