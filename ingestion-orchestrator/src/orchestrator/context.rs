use std::{collections::HashSet, path::PathBuf};

use common::{
    error::AppError,
    store::VectorStore,
    types::{
        batch::BatchResult, document::FailedDocument, ingestion_job::IngestionJob,
        job_result::ValidationError,
    },
};
use tracing::error;

use super::{
    aggregator::MergedResults, config::OrchestratorConfig, services::ExtractionService,
};
use crate::tracker::CancellationFlag;

/// Working state for one upload, threaded through the stages.
pub struct JobContext<'a> {
    pub job: &'a IngestionJob,
    pub job_id: String,
    pub config: &'a OrchestratorConfig,
    pub services: &'a dyn ExtractionService,
    pub store: &'a dyn VectorStore,
    pub cancellation: CancellationFlag,
    pub accepted_files: Vec<PathBuf>,
    pub prevalidation_failures: Vec<FailedDocument>,
    pub validation_errors: Vec<ValidationError>,
    pub batch_results: Vec<BatchResult>,
    pub merged: Option<MergedResults>,
}

impl<'a> JobContext<'a> {
    pub fn new(
        job: &'a IngestionJob,
        config: &'a OrchestratorConfig,
        services: &'a dyn ExtractionService,
        store: &'a dyn VectorStore,
        cancellation: CancellationFlag,
    ) -> Self {
        let job_id = job.id.clone();
        Self {
            job,
            job_id,
            config,
            services,
            store,
            cancellation,
            accepted_files: Vec::new(),
            prevalidation_failures: Vec::new(),
            validation_errors: Vec::new(),
            batch_results: Vec::new(),
            merged: None,
        }
    }

    pub fn merged(&self) -> Result<&MergedResults, AppError> {
        self.merged.as_ref().ok_or_else(|| {
            AppError::InternalError("merged results expected to be available".into())
        })
    }

    /// Names rejected before extraction; the validator must not re-query
    /// them.
    pub fn prevalidation_failed_names(&self) -> HashSet<String> {
        self.prevalidation_failures
            .iter()
            .map(|failure| failure.document_name.clone())
            .collect()
    }

    pub fn abort(&mut self, err: AppError) -> AppError {
        error!(
            job_id = %self.job_id,
            collection = %self.job.collection_name,
            error = %err,
            "ingestion job aborted"
        );
        err
    }
}
