pub mod clients;
pub mod models;
pub mod pipeline;
pub mod state;
pub mod transform;
pub mod utils;
pub mod writers;

use common::Result;
use common::config::Settings;
use object_store::local::LocalFileSystem;
use std::sync::Arc;

use clients::OpenMeteoClient;
use models::RunResult;
use pipeline::Pipeline;
use state::JsonStateStore;
use writers::ParquetWriter;

/// Runs the complete ingestion pipeline from a configuration file.
pub async fn run_ingestion_pipeline(config_path: &str) -> Result<RunResult> {
    let settings = Settings::new(config_path)?;
    settings.validate().map_err(common::Error::Config)?;

    let source = Arc::new(OpenMeteoClient::new(&settings)?);

    std::fs::create_dir_all(&settings.storage.base_path)?;
    let store = Arc::new(LocalFileSystem::new_with_prefix(
        &settings.storage.base_path,
    )?);
    let writer = Arc::new(ParquetWriter::with_compression_name(
        store,
        &settings.storage.compression,
    )?);

    let state_store = Arc::new(JsonStateStore::new(&settings.state.path));

    Pipeline::new(settings, source, writer, state_store)
        .run()
        .await
}
