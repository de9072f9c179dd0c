use common::{
    error::AppError,
    types::{
        batch::{Batch, BatchResult},
        document::{document_name, FailedDocument},
        ingestion_job::SplitOptions,
    },
};
use futures::future::join_all;
use std::path::Path;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::{config::ExecutionMode, services::ExtractionService};
use crate::tracker::CancellationFlag;

pub const CANCELLED_REASON: &str =
    "Ingestion job was cancelled before this batch was dispatched";

/// Runs a job's batches through the extraction service, sequentially or
/// behind a bounded permit pool. A batch-level extraction error never
/// aborts the job; it is converted into per-file failures so later stages
/// can account for every file.
pub struct BatchExecutor<'a> {
    services: &'a dyn ExtractionService,
    collection_name: &'a str,
    split_options: &'a SplitOptions,
    cancellation: &'a CancellationFlag,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(
        services: &'a dyn ExtractionService,
        collection_name: &'a str,
        split_options: &'a SplitOptions,
        cancellation: &'a CancellationFlag,
    ) -> Self {
        Self {
            services,
            collection_name,
            split_options,
            cancellation,
        }
    }

    pub async fn run(
        &self,
        batches: Vec<Batch>,
        mode: ExecutionMode,
    ) -> Result<Vec<BatchResult>, AppError> {
        match mode {
            ExecutionMode::Sequential => Ok(self.run_sequential(batches).await),
            ExecutionMode::Parallel { concurrent_batches } => {
                self.run_parallel(batches, concurrent_batches).await
            }
        }
    }

    async fn run_sequential(&self, batches: Vec<Batch>) -> Vec<BatchResult> {
        let total_batches = batches.len();
        let mut results = Vec::with_capacity(total_batches);
        for batch in batches {
            results.push(self.process_batch(batch, total_batches).await);
        }
        results
    }

    async fn run_parallel(
        &self,
        batches: Vec<Batch>,
        concurrent_batches: usize,
    ) -> Result<Vec<BatchResult>, AppError> {
        let total_batches = batches.len();
        let semaphore = Semaphore::new(concurrent_batches.max(1));

        let tasks = batches.into_iter().map(|batch| {
            let semaphore = &semaphore;
            async move {
                let _permit = semaphore.acquire().await.map_err(|err| {
                    AppError::InternalError(format!("batch permit pool closed: {err}"))
                })?;
                Ok::<_, AppError>(self.process_batch(batch, total_batches).await)
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    async fn process_batch(&self, batch: Batch, total_batches: usize) -> BatchResult {
        // Cancellation is checked at dispatch only; a batch that already
        // started runs to completion.
        if self.cancellation.is_cancelled() {
            warn!(
                collection = %self.collection_name,
                batch = batch.number,
                "job cancelled; batch not dispatched"
            );
            return BatchResult::all_failed(&batch, CANCELLED_REASON);
        }

        info!(
            collection = %self.collection_name,
            batch = batch.number,
            total_batches,
            files = batch.files.len(),
            "processing batch"
        );

        match self
            .services
            .extract_batch(&batch.files, self.collection_name, self.split_options)
            .await
        {
            Ok(outcome) => {
                let failures = outcome
                    .failures
                    .into_iter()
                    .map(|(source, error)| {
                        FailedDocument::new(document_name(Path::new(&source)), error)
                    })
                    .collect();
                BatchResult {
                    number: batch.number,
                    documents: outcome.documents,
                    failures,
                }
            }
            Err(err) => {
                warn!(
                    collection = %self.collection_name,
                    batch = batch.number,
                    error = %err,
                    "batch extraction failed; marking every file in the batch as failed"
                );
                BatchResult::all_failed(&batch, &format!("Extraction failed: {err}"))
            }
        }
    }
}
