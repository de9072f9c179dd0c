use std::{path::PathBuf, sync::Arc};

use common::{
    store::http::HttpVectorStore,
    types::ingestion_job::{IngestionJob, SplitOptions},
    utils::{config::get_config, job_limits::validate_job_input},
};
use ingestion_orchestrator::{HttpExtractionService, IngestionOrchestrator};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set up tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let mut args = std::env::args().skip(1);
    let collection_name = args
        .next()
        .ok_or("usage: ingest <collection_name> <file>...")?;
    let filepaths: Vec<PathBuf> = args.map(PathBuf::from).collect();

    validate_job_input(&config, filepaths.len(), config.files_per_batch)
        .map_err(|err| format!("invalid upload request: {err:?}"))?;

    let services = Arc::new(HttpExtractionService::new(&config.extraction_endpoint)?);
    let store = Arc::new(HttpVectorStore::new(&config.vector_store_url)?);
    let orchestrator = IngestionOrchestrator::from_app_config(&config, services, store);

    let job = IngestionJob::new(filepaths, collection_name).with_split_options(SplitOptions {
        chunk_size: config.chunk_size,
        chunk_overlap: config.chunk_overlap,
    });

    info!(
        job_id = %job.id,
        collection = %job.collection_name,
        files = job.filepaths.len(),
        "starting ingestion job"
    );

    let result = orchestrator.upload_documents(job).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.failed_documents.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
