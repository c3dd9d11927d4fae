use chrono::{Datelike, NaiveDateTime, Timelike};
use common::config::Interval;

/// Builds deterministic partition paths of the form
/// `{provider}/{interval}/{location}/{YYYY}/{MM}/{DD}/{filename}`.
///
/// The date segments come from the batch's ingestion timestamp. Daily file
/// names are intentionally collision-prone so a same-day rerun replaces the
/// previous file; hourly names carry the hour and run id so runs within the
/// same hour never collide.
pub struct PartitionPath {
    provider: String,
    interval: Interval,
    location_name: String,
    ingestion_timestamp: NaiveDateTime,
}

impl PartitionPath {
    pub fn new(
        provider: &str,
        interval: Interval,
        location_name: &str,
        ingestion_timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            provider: provider.to_string(),
            interval,
            location_name: location_name.to_string(),
            ingestion_timestamp,
        }
    }

    pub fn build_storage_path(&self) -> String {
        format!(
            "{}/{}/{}/{}/{:02}/{:02}",
            self.provider,
            self.interval,
            self.location_name,
            self.ingestion_timestamp.year(),
            self.ingestion_timestamp.month(),
            self.ingestion_timestamp.day()
        )
    }

    pub fn file_name(&self, run_id: &str) -> String {
        let date = self.ingestion_timestamp.format("%Y%m%d");
        match self.interval {
            Interval::Daily => format!("forecast_{}.parquet", date),
            Interval::Hourly => format!(
                "forecast_{}_{:02}h_{}.parquet",
                date,
                self.ingestion_timestamp.hour(),
                run_id
            ),
        }
    }

    pub fn build_file_path(&self, run_id: &str) -> String {
        format!("{}/{}", self.build_storage_path(), self.file_name(run_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn timestamp(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn daily_path_is_deterministic() {
        let path = PartitionPath::new("open_meteo", Interval::Daily, "London", timestamp(0));
        assert_eq!(
            path.build_file_path("abc"),
            "open_meteo/daily/London/2025/01/15/forecast_20250115.parquet"
        );
    }

    #[test]
    fn hourly_path_includes_hour_and_run_id() {
        let path = PartitionPath::new("open_meteo", Interval::Hourly, "London", timestamp(14));
        assert_eq!(
            path.build_file_path("abc"),
            "open_meteo/hourly/London/2025/01/15/forecast_20250115_14h_abc.parquet"
        );
    }

    #[test]
    fn month_and_day_are_zero_padded() {
        let ts = NaiveDate::from_ymd_opt(2025, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let path = PartitionPath::new("open_meteo", Interval::Hourly, "Tokyo", ts);
        assert_eq!(
            path.build_storage_path(),
            "open_meteo/hourly/Tokyo/2025/03/05"
        );
        assert_eq!(path.file_name("run1"), "forecast_20250305_09h_run1.parquet");
    }
}
