use async_trait::async_trait;
use bytes::Bytes;
use common::config::Interval;
use common::{Error, Result};
use object_store::{ObjectStore, PutPayload, path::Path as ObjectPath};
use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, GzipLevel, ZstdLevel};
use parquet::file::properties::WriterProperties;
use std::sync::Arc;
use tracing::{debug, info};

use super::{ForecastWriter, schema};
use crate::models::{RowBatch, WriteResult};
use crate::utils::paths::PartitionPath;

/// Writes normalized rows as parquet objects. The columnar encoding happens
/// in an in-memory buffer; the storage backend only ever sees opaque bytes.
pub struct ParquetWriter {
    store: Arc<dyn ObjectStore>,
    compression: Compression,
}

impl ParquetWriter {
    pub fn new(store: Arc<dyn ObjectStore>, compression: Compression) -> Self {
        Self { store, compression }
    }

    pub fn with_compression_name(store: Arc<dyn ObjectStore>, name: &str) -> Result<Self> {
        Ok(Self::new(store, parse_compression(name)?))
    }
}

pub fn parse_compression(name: &str) -> Result<Compression> {
    match name.to_ascii_lowercase().as_str() {
        "snappy" => Ok(Compression::SNAPPY),
        "zstd" => Ok(Compression::ZSTD(ZstdLevel::default())),
        "gzip" => Ok(Compression::GZIP(GzipLevel::default())),
        "lz4" => Ok(Compression::LZ4),
        "none" | "uncompressed" => Ok(Compression::UNCOMPRESSED),
        other => Err(Error::InvalidInput(format!(
            "unsupported parquet compression '{}'",
            other
        ))),
    }
}

#[async_trait]
impl ForecastWriter for ParquetWriter {
    async fn write(&self, batch: &RowBatch, partition_path: &str) -> Result<WriteResult> {
        let record_batch = schema::to_record_batch(batch)?;

        let props = WriterProperties::builder()
            .set_compression(self.compression)
            .build();
        let mut buffer: Vec<u8> = Vec::new();
        let mut writer = ArrowWriter::try_new(&mut buffer, record_batch.schema(), Some(props))?;
        writer.write(&record_batch)?;
        writer.close()?;

        let object_path = ObjectPath::parse(partition_path)?;
        self.store
            .put(&object_path, PutPayload::from(Bytes::from(buffer)))
            .await?;

        debug!(path = partition_path, records = batch.len(), "Wrote partition");

        Ok(WriteResult {
            path: partition_path.to_string(),
            records_written: batch.len(),
            format: "parquet".to_string(),
        })
    }

    async fn write_partitioned(
        &self,
        batch: RowBatch,
        interval: Interval,
        provider: &str,
        run_id: &str,
    ) -> Result<Vec<WriteResult>> {
        let mut results = Vec::new();

        // Partition layout is a location-keyed hierarchy, so grouping by
        // location is mandatory even for a single-file-capable backend.
        for location_name in batch.location_names() {
            let location_batch = batch.for_location(&location_name);
            let ingestion_timestamp =
                location_batch.first_ingestion_timestamp().ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "no rows to write for location '{}'",
                        location_name
                    ))
                })?;

            let path = PartitionPath::new(provider, interval, &location_name, ingestion_timestamp)
                .build_file_path(run_id);
            results.push(self.write(&location_batch, &path).await?);
        }

        info!(partitions = results.len(), "Partitioned write complete");
        Ok(results)
    }
}
