use chrono::{NaiveDate, NaiveDateTime};
use common::config::Interval;
use common::{Error, Result};

/// One normalized hourly observation. All timestamps are timezone-naive
/// so the columnar encoder never sees mixed timezone representations.
#[derive(Debug, Clone)]
pub struct HourlyRow {
    pub location_name: String,
    pub requested_latitude: f64,
    pub requested_longitude: f64,
    pub api_latitude: Option<f64>,
    pub api_longitude: Option<f64>,
    pub timestamp: NaiveDateTime,
    pub temperature_2m: Option<f64>,
    pub precipitation: Option<f64>,
    pub relative_humidity_2m: Option<f64>,
    pub windspeed_10m: Option<f64>,
    pub wind_direction_10m: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub weather_code: Option<i64>,
    pub source_provider: String,
    pub ingestion_timestamp: NaiveDateTime,
    pub run_id: String,
}

/// One normalized daily aggregate.
#[derive(Debug, Clone)]
pub struct DailyRow {
    pub location_name: String,
    pub requested_latitude: f64,
    pub requested_longitude: f64,
    pub api_latitude: Option<f64>,
    pub api_longitude: Option<f64>,
    pub date: NaiveDate,
    pub temperature_2m_max: Option<f64>,
    pub temperature_2m_min: Option<f64>,
    pub precipitation_sum: Option<f64>,
    pub source_provider: String,
    pub ingestion_timestamp: NaiveDateTime,
    pub run_id: String,
}

/// A batch of normalized rows of a single interval shape. Batches from
/// different locations concatenate as long as the interval matches.
#[derive(Debug, Clone)]
pub enum RowBatch {
    Hourly(Vec<HourlyRow>),
    Daily(Vec<DailyRow>),
}

impl RowBatch {
    pub fn interval(&self) -> Interval {
        match self {
            RowBatch::Hourly(_) => Interval::Hourly,
            RowBatch::Daily(_) => Interval::Daily,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RowBatch::Hourly(rows) => rows.len(),
            RowBatch::Daily(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends another batch of the same interval shape.
    pub fn extend(&mut self, other: RowBatch) -> Result<()> {
        match (self, other) {
            (RowBatch::Hourly(rows), RowBatch::Hourly(more)) => rows.extend(more),
            (RowBatch::Daily(rows), RowBatch::Daily(more)) => rows.extend(more),
            _ => {
                return Err(Error::InvalidInput(
                    "cannot concatenate hourly and daily row batches".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Distinct location names in first-seen row order.
    pub fn location_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let mut push = |name: &str| {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        };
        match self {
            RowBatch::Hourly(rows) => rows.iter().for_each(|r| push(&r.location_name)),
            RowBatch::Daily(rows) => rows.iter().for_each(|r| push(&r.location_name)),
        }
        names
    }

    pub fn for_location(&self, name: &str) -> RowBatch {
        match self {
            RowBatch::Hourly(rows) => RowBatch::Hourly(
                rows.iter()
                    .filter(|r| r.location_name == name)
                    .cloned()
                    .collect(),
            ),
            RowBatch::Daily(rows) => RowBatch::Daily(
                rows.iter()
                    .filter(|r| r.location_name == name)
                    .cloned()
                    .collect(),
            ),
        }
    }

    /// The first row's ingestion timestamp, authoritative for the whole
    /// batch when computing partition dates.
    pub fn first_ingestion_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowBatch::Hourly(rows) => rows.first().map(|r| r.ingestion_timestamp),
            RowBatch::Daily(rows) => rows.first().map(|r| r.ingestion_timestamp),
        }
    }
}
