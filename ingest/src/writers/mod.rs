pub mod parquet;
pub mod schema;

pub use parquet::ParquetWriter;

use async_trait::async_trait;
use common::Result;
use common::config::Interval;

use crate::models::{RowBatch, WriteResult};

/// Capability contract for a storage backend that commits normalized rows.
/// Alternate backends are additional implementations of this trait.
#[async_trait]
pub trait ForecastWriter: Send + Sync {
    /// Writes every row of the batch under the given relative path.
    async fn write(&self, batch: &RowBatch, partition_path: &str) -> Result<WriteResult>;

    /// Splits a mixed-location batch into one group per distinct location
    /// and writes each group to its own deterministic partition.
    async fn write_partitioned(
        &self,
        batch: RowBatch,
        interval: Interval,
        provider: &str,
        run_id: &str,
    ) -> Result<Vec<WriteResult>>;
}
