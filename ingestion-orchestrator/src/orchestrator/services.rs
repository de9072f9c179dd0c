use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use common::{
    error::AppError,
    types::{batch::ExtractedDocument, ingestion_job::SplitOptions},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

/// Outcome of one extraction call: element lists for the files that
/// processed, plus `(source, reason)` pairs for those that did not.
#[derive(Debug, Clone, Default)]
pub struct ExtractionOutcome {
    pub documents: Vec<ExtractedDocument>,
    pub failures: Vec<(String, String)>,
}

/// Seam to the external extraction and embedding service. One call covers
/// one batch; an `Err` means the batch failed wholesale.
#[async_trait]
pub trait ExtractionService: Send + Sync {
    async fn extract_batch(
        &self,
        files: &[PathBuf],
        collection_name: &str,
        split_options: &SplitOptions,
    ) -> Result<ExtractionOutcome, AppError>;
}

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    files: Vec<String>,
    collection_name: &'a str,
    split_options: &'a SplitOptions,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    results: Vec<ExtractedDocument>,
    #[serde(default)]
    failures: Vec<ExtractFailure>,
}

#[derive(Debug, Deserialize)]
struct ExtractFailure {
    source: String,
    error: String,
}

/// Default implementation talking to the extraction service over HTTP.
pub struct HttpExtractionService {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpExtractionService {
    pub fn new(endpoint: &str) -> Result<Self, AppError> {
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };
        let endpoint = Url::parse(&normalized)
            .map_err(|err| AppError::Validation(format!("invalid extraction endpoint: {err}")))?;

        Ok(Self {
            endpoint,
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl ExtractionService for HttpExtractionService {
    async fn extract_batch(
        &self,
        files: &[PathBuf],
        collection_name: &str,
        split_options: &SplitOptions,
    ) -> Result<ExtractionOutcome, AppError> {
        let url = self
            .endpoint
            .join("v1/extract")
            .map_err(|err| AppError::InternalError(format!("extraction url: {err}")))?;

        let request = ExtractRequest {
            files: files
                .iter()
                .map(|path| path.to_string_lossy().into_owned())
                .collect(),
            collection_name,
            split_options,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let payload: ExtractResponse = response
            .json()
            .await
            .context("decoding extraction response")?;

        debug!(
            collection = collection_name,
            documents = payload.results.len(),
            failures = payload.failures.len(),
            "extraction batch returned"
        );

        Ok(ExtractionOutcome {
            documents: payload.results,
            failures: payload
                .failures
                .into_iter()
                .map(|failure| (failure.source, failure.error))
                .collect(),
        })
    }
}
