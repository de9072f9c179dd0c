mod aggregator;
mod config;
mod context;
mod executor;
mod prevalidate;
mod services;
mod splitter;
mod stages;
mod state;
mod validator;

pub use config::{BatchTuning, ExecutionMode, OrchestratorConfig};
pub use executor::CANCELLED_REASON;
pub use prevalidate::SUPPORTED_EXTENSIONS;
#[allow(clippy::module_name_repetitions)]
pub use services::{ExtractionOutcome, ExtractionService, HttpExtractionService};
pub use splitter::split_into_batches;
pub use validator::{ConsistencyValidator, INGESTION_INCOMPLETE};

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    store::VectorStore,
    types::{
        document::{document_name, UploadedDocument},
        ingestion_job::IngestionJob,
        job_result::JobResult,
    },
    utils::config::AppConfig,
};
use tracing::info;

use self::{
    context::JobContext,
    stages::{execute_batches, merge_results, prevalidate, verify_visibility},
    state::ready,
};
use crate::tracker::{CancellationFlag, JobHandle, JobTracker};

const SUCCESS_MESSAGE: &str = "Document upload job successfully completed.";
const ALL_FAILED_MESSAGE: &str =
    "Document upload job failed. All files failed to validate. Check logs for details.";

/// Drives one upload request end to end: pre-validation, batched
/// extraction, deterministic aggregation and store-visibility confirmation.
#[allow(clippy::module_name_repetitions)]
pub struct IngestionOrchestrator {
    config: OrchestratorConfig,
    services: Arc<dyn ExtractionService>,
    store: Arc<dyn VectorStore>,
}

impl IngestionOrchestrator {
    pub fn new(
        config: OrchestratorConfig,
        services: Arc<dyn ExtractionService>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            config,
            services,
            store,
        }
    }

    pub fn from_app_config(
        app_config: &AppConfig,
        services: Arc<dyn ExtractionService>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self::new(OrchestratorConfig::from_app_config(app_config), services, store)
    }

    /// Runs the job to completion and returns its final result. Every
    /// submitted file ends up in exactly one bucket of the result.
    #[tracing::instrument(
        skip_all,
        fields(
            job_id = %job.id,
            collection = %job.collection_name,
            files = job.filepaths.len(),
            blocking = job.blocking
        )
    )]
    pub async fn upload_documents(&self, job: IngestionJob) -> Result<JobResult, AppError> {
        self.upload_documents_with_cancellation(job, CancellationFlag::new())
            .await
    }

    pub async fn upload_documents_with_cancellation(
        &self,
        job: IngestionJob,
        cancellation: CancellationFlag,
    ) -> Result<JobResult, AppError> {
        let mut ctx = JobContext::new(
            &job,
            &self.config,
            self.services.as_ref(),
            self.store.as_ref(),
            cancellation,
        );

        let machine = ready();
        let job_started = Instant::now();

        let stage_start = Instant::now();
        let machine = prevalidate(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let prevalidate_duration = stage_start.elapsed();

        if ctx.accepted_files.is_empty() {
            info!(
                job_id = %ctx.job_id,
                rejected = ctx.prevalidation_failures.len(),
                "no files survived pre-validation"
            );
            return Ok(JobResult::failure(
                ALL_FAILED_MESSAGE,
                job.filepaths.len(),
                ctx.prevalidation_failures,
                ctx.validation_errors,
            ));
        }

        let stage_start = Instant::now();
        let machine = execute_batches(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let execute_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let machine = merge_results(machine, &mut ctx).map_err(|err| ctx.abort(err))?;
        let merge_duration = stage_start.elapsed();

        let stage_start = Instant::now();
        let _machine = verify_visibility(machine, &mut ctx)
            .await
            .map_err(|err| ctx.abort(err))?;
        let verify_duration = stage_start.elapsed();

        let result = build_job_result(ctx).await;

        info!(
            job_id = %job.id,
            total_ms = Self::duration_millis(job_started.elapsed()),
            prevalidate_ms = Self::duration_millis(prevalidate_duration),
            execute_ms = Self::duration_millis(execute_duration),
            merge_ms = Self::duration_millis(merge_duration),
            verify_ms = Self::duration_millis(verify_duration),
            documents = result.documents.len(),
            failed_documents = result.failed_documents.len(),
            "ingestion job finished"
        );

        Ok(result)
    }

    /// Starts the job in the background and hands back an explicit handle
    /// the caller can await, cancel or ignore.
    pub async fn submit_upload(
        self: Arc<Self>,
        tracker: &JobTracker,
        job: IngestionJob,
    ) -> JobHandle {
        let cancellation = CancellationFlag::new();
        let job_id = job.id.clone();
        let flag = cancellation.clone();
        let orchestrator = Arc::clone(&self);

        tracker
            .submit(job_id, cancellation, async move {
                orchestrator
                    .upload_documents_with_cancellation(job, flag)
                    .await
            })
            .await
    }

    fn duration_millis(duration: Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }
}

/// Folds the context into the final result. Uploaded-document descriptors
/// are built only for accepted files that did not fail any later stage.
async fn build_job_result(ctx: JobContext<'_>) -> JobResult {
    let merged = ctx.merged.unwrap_or_default();

    let mut failed_names: HashSet<String> = merged
        .failures
        .iter()
        .map(|failure| failure.document_name.clone())
        .collect();
    failed_names.extend(
        ctx.prevalidation_failures
            .iter()
            .map(|failure| failure.document_name.clone()),
    );

    let metadata_by_name: HashMap<&str, &serde_json::Value> = ctx
        .job
        .custom_metadata
        .iter()
        .map(|entry| (entry.filename.as_str(), &entry.metadata))
        .collect();

    let mut documents = Vec::with_capacity(ctx.accepted_files.len());
    for path in &ctx.accepted_files {
        let name = document_name(path);
        if failed_names.contains(&name) {
            continue;
        }

        let size_bytes = tokio::fs::metadata(path)
            .await
            .map(|metadata| metadata.len())
            .unwrap_or_default();
        let metadata = metadata_by_name
            .get(name.as_str())
            .map_or(serde_json::Value::Null, |value| (*value).clone());

        documents.push(UploadedDocument::new(path, size_bytes, metadata));
    }

    let mut failed_documents = merged.failures;
    failed_documents.extend(ctx.prevalidation_failures);

    JobResult {
        message: SUCCESS_MESSAGE.to_string(),
        total_documents: ctx.job.filepaths.len(),
        documents,
        failed_documents,
        validation_errors: ctx.validation_errors,
    }
}

#[cfg(test)]
mod tests;
