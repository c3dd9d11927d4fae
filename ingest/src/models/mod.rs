mod outcome;
mod result;
mod row;

pub use outcome::{ApiMetadata, FetchFailure, FetchOutcome, FetchSuccess, IngestionMetadata};
pub use result::{RunResult, WriteResult};
pub use row::{DailyRow, HourlyRow, RowBatch};
