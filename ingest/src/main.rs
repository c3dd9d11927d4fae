use clap::{Arg, Command};
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let matches = Command::new("Weather Pipeline Manager")
        .version("1.0")
        .about("Manages the weather forecast ingestion pipeline")
        .subcommand(
            Command::new("ingest")
                .about("Run the ingestion pipeline")
                .arg(
                    Arg::new("config")
                        .short('c')
                        .long("config")
                        .value_name("FILE")
                        .help("Sets a custom config file"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("ingest", ingest_matches)) => {
            let config_path = ingest_matches
                .get_one::<String>("config")
                .map(|s| s.as_str())
                .unwrap_or("config/ingest.toml");
            println!("Starting ingestion pipeline with config: {}", config_path);

            match ingest::run_ingestion_pipeline(config_path).await {
                Ok(result) if result.success => {
                    println!(
                        "Pipeline succeeded: {} records written across {} files ({} failed fetches)",
                        result.records_processed,
                        result.files.len(),
                        result.failed.len()
                    );
                }
                Ok(result) => {
                    eprintln!(
                        "Pipeline failed: {}",
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                    process::exit(1);
                }
                Err(e) => {
                    eprintln!("Ingestion pipeline error: {}", e);
                    process::exit(1);
                }
            }
        }

        _ => {
            eprintln!("Please specify a valid subcommand");
            process::exit(1);
        }
    }
}
