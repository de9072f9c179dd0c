use std::collections::HashSet;
use std::path::PathBuf;

use common::{error::AppError, types::document::document_name};
use state_machines::core::GuardError;
use tracing::{debug, info, instrument, warn};

use super::{
    aggregator::merge_batch_results,
    context::JobContext,
    executor::BatchExecutor,
    prevalidate::{prevalidate_files, validate_custom_metadata},
    splitter::split_into_batches,
    state::{Executed, Merged, Ready, UploadMachine, Validated, Verified},
    validator::ConsistencyValidator,
};

#[instrument(
    level = "trace",
    skip_all,
    fields(job_id = %ctx.job_id, collection = %ctx.job.collection_name)
)]
pub async fn prevalidate(
    machine: UploadMachine<(), Ready>,
    ctx: &mut JobContext<'_>,
) -> Result<UploadMachine<(), Validated>, AppError> {
    if !ctx.store.collection_exists(&ctx.job.collection_name).await? {
        return Err(AppError::Validation(format!(
            "Collection {} does not exist. Create the collection before uploading documents.",
            ctx.job.collection_name
        )));
    }

    let metadata = validate_custom_metadata(&ctx.job.custom_metadata, &ctx.job.filepaths);
    let metadata_rejected: HashSet<String> = metadata
        .rejected
        .iter()
        .map(|failure| failure.document_name.clone())
        .collect();
    ctx.validation_errors = metadata.errors;
    ctx.prevalidation_failures = metadata.rejected;

    // A failed listing only disables the duplicate check; the job proceeds.
    let existing_documents = match ctx
        .store
        .list_document_names(&ctx.job.collection_name)
        .await
    {
        Ok(existing) => existing,
        Err(err) => {
            warn!(
                job_id = %ctx.job_id,
                error = %err,
                "could not list existing documents; duplicate check skipped"
            );
            HashSet::new()
        }
    };

    let candidates: Vec<PathBuf> = ctx
        .job
        .filepaths
        .iter()
        .filter(|path| !metadata_rejected.contains(&document_name(path)))
        .cloned()
        .collect();

    let outcome = prevalidate_files(&candidates, &existing_documents).await;
    ctx.accepted_files = outcome.accepted;
    ctx.prevalidation_failures.extend(outcome.rejected);

    info!(
        job_id = %ctx.job_id,
        accepted = ctx.accepted_files.len(),
        rejected = ctx.prevalidation_failures.len(),
        validation_errors = ctx.validation_errors.len(),
        "pre-validation complete"
    );

    machine
        .validate()
        .map_err(|(_, guard)| map_guard_error("validate", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(job_id = %ctx.job_id, collection = %ctx.job.collection_name)
)]
pub async fn execute_batches(
    machine: UploadMachine<(), Validated>,
    ctx: &mut JobContext<'_>,
) -> Result<UploadMachine<(), Executed>, AppError> {
    let tuning = &ctx.config.tuning;
    let batches = if tuning.batch_mode {
        split_into_batches(&ctx.accepted_files, tuning.files_per_batch)
    } else {
        // Single-batch mode: the whole job goes through one extraction call.
        split_into_batches(&ctx.accepted_files, ctx.accepted_files.len().max(1))
    };

    info!(
        job_id = %ctx.job_id,
        batches = batches.len(),
        mode = ?tuning.execution_mode,
        "dispatching batches"
    );

    let executor = BatchExecutor::new(
        ctx.services,
        &ctx.job.collection_name,
        &ctx.job.split_options,
        &ctx.cancellation,
    );
    ctx.batch_results = executor.run(batches, tuning.execution_mode).await?;

    machine
        .execute()
        .map_err(|(_, guard)| map_guard_error("execute", &guard))
}

pub fn merge_results(
    machine: UploadMachine<(), Executed>,
    ctx: &mut JobContext<'_>,
) -> Result<UploadMachine<(), Merged>, AppError> {
    let merged = merge_batch_results(std::mem::take(&mut ctx.batch_results));

    debug!(
        job_id = %ctx.job_id,
        documents = merged.documents.len(),
        failures = merged.failures.len(),
        "merged batch results"
    );

    ctx.merged = Some(merged);

    machine
        .merge()
        .map_err(|(_, guard)| map_guard_error("merge", &guard))
}

#[instrument(
    level = "trace",
    skip_all,
    fields(job_id = %ctx.job_id, collection = %ctx.job.collection_name)
)]
pub async fn verify_visibility(
    machine: UploadMachine<(), Merged>,
    ctx: &mut JobContext<'_>,
) -> Result<UploadMachine<(), Verified>, AppError> {
    let mut already_failed = ctx.merged()?.failed_names();
    already_failed.extend(ctx.prevalidation_failed_names());

    let expected: Vec<String> = ctx
        .accepted_files
        .iter()
        .map(|path| document_name(path))
        .collect();

    let validator = ConsistencyValidator::new(ctx.store, ctx.config.validation_policy);
    let newly_failed = validator
        .confirm_visibility(&ctx.job.collection_name, &expected, &already_failed)
        .await;

    if !newly_failed.is_empty() {
        let merged = ctx.merged.as_mut().ok_or_else(|| {
            AppError::InternalError("merged results expected to be available".into())
        })?;
        merged.failures.extend(newly_failed);
    }

    machine
        .verify()
        .map_err(|(_, guard)| map_guard_error("verify", &guard))
}

fn map_guard_error(event: &str, guard: &GuardError) -> AppError {
    AppError::InternalError(format!(
        "invalid upload stage transition during {event}: {guard:?}"
    ))
}
