use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default = "default_extraction_endpoint")]
    pub extraction_endpoint: String,
    #[serde(default = "default_vector_store_url")]
    pub vector_store_url: String,
    #[serde(default = "default_vector_store_name")]
    pub vector_store_name: String,
    /// AWS service indicator for managed search backends; "aoss" selects
    /// the serverless consistency profile.
    #[serde(default)]
    pub vector_store_aws_service: Option<String>,
    #[serde(default = "default_batch_mode")]
    pub batch_mode: bool,
    #[serde(default = "default_files_per_batch")]
    pub files_per_batch: usize,
    #[serde(default = "default_parallel_batch_mode")]
    pub parallel_batch_mode: bool,
    #[serde(default = "default_concurrent_batches")]
    pub concurrent_batches: usize,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Overrides the per-backend retry count for consistency validation.
    #[serde(default)]
    pub validation_max_retries: Option<u32>,
    #[serde(default = "default_ingest_max_files")]
    pub ingest_max_files: usize,
}

fn default_extraction_endpoint() -> String {
    "http://localhost:7670".to_string()
}

fn default_vector_store_url() -> String {
    "http://localhost:8082".to_string()
}

fn default_vector_store_name() -> String {
    "milvus".to_string()
}

fn default_batch_mode() -> bool {
    true
}

fn default_files_per_batch() -> usize {
    16
}

fn default_parallel_batch_mode() -> bool {
    true
}

fn default_concurrent_batches() -> usize {
    4
}

fn default_chunk_size() -> usize {
    512
}

fn default_chunk_overlap() -> usize {
    150
}

fn default_ingest_max_files() -> usize {
    128
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            extraction_endpoint: default_extraction_endpoint(),
            vector_store_url: default_vector_store_url(),
            vector_store_name: default_vector_store_name(),
            vector_store_aws_service: None,
            batch_mode: default_batch_mode(),
            files_per_batch: default_files_per_batch(),
            parallel_batch_mode: default_parallel_batch_mode(),
            concurrent_batches: default_concurrent_batches(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            validation_max_retries: None,
            ingest_max_files: default_ingest_max_files(),
        }
    }
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}
