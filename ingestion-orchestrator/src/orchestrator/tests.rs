use std::{
    collections::HashSet,
    io::Write,
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use common::{
    error::AppError,
    store::{consistency::ValidationPolicy, memory::MemoryVectorStore},
    types::{
        batch::{ContentElement, ElementKind, ExtractedDocument},
        document::document_name,
        ingestion_job::{CustomMetadata, IngestionJob, SplitOptions},
    },
};
use tempfile::TempDir;
use tokio::sync::Mutex;

use super::{
    BatchTuning, ExecutionMode, ExtractionOutcome, ExtractionService, IngestionOrchestrator,
    OrchestratorConfig, CANCELLED_REASON, INGESTION_INCOMPLETE,
};
use crate::tracker::{CancellationFlag, JobState, JobTracker};

const COLLECTION: &str = "multimodal_data";

/// Extraction stand-in that writes extracted names into the memory store,
/// optionally with a visibility lag, and can be scripted to fail whole
/// batches or individual files.
struct MockExtraction {
    store: Arc<MemoryVectorStore>,
    lag: u32,
    fail_on: Option<String>,
    per_file_failures: HashSet<String>,
    skip_store_write: HashSet<String>,
    cancel_during_call: Option<CancellationFlag>,
    calls: AtomicUsize,
    files_seen: Mutex<Vec<String>>,
}

impl MockExtraction {
    fn new(store: Arc<MemoryVectorStore>) -> Self {
        Self {
            store,
            lag: 0,
            fail_on: None,
            per_file_failures: HashSet::new(),
            skip_store_write: HashSet::new(),
            cancel_during_call: None,
            calls: AtomicUsize::new(0),
            files_seen: Mutex::new(Vec::new()),
        }
    }

    fn with_lag(mut self, lag: u32) -> Self {
        self.lag = lag;
        self
    }

    fn failing_batches_containing(mut self, name: &str) -> Self {
        self.fail_on = Some(name.to_string());
        self
    }

    fn skipping_store_write_for(mut self, name: &str) -> Self {
        self.skip_store_write.insert(name.to_string());
        self
    }

    fn failing_file(mut self, name: &str) -> Self {
        self.per_file_failures.insert(name.to_string());
        self
    }

    fn cancelling_during_call(mut self, flag: CancellationFlag) -> Self {
        self.cancel_during_call = Some(flag);
        self
    }
}

#[async_trait]
impl ExtractionService for MockExtraction {
    async fn extract_batch(
        &self,
        files: &[PathBuf],
        collection_name: &str,
        _split_options: &SplitOptions,
    ) -> Result<ExtractionOutcome, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(flag) = &self.cancel_during_call {
            flag.cancel();
        }

        if let Some(poison) = &self.fail_on {
            if files.iter().any(|file| document_name(file) == *poison) {
                return Err(AppError::Processing(
                    "extraction service unreachable".to_string(),
                ));
            }
        }

        let mut outcome = ExtractionOutcome::default();
        let mut written = Vec::new();
        for file in files {
            let name = document_name(file);
            self.files_seen.lock().await.push(name.clone());

            if self.per_file_failures.contains(&name) {
                outcome
                    .failures
                    .push((name, "failed to parse document".to_string()));
                continue;
            }

            outcome.documents.push(ExtractedDocument {
                source_name: name.clone(),
                elements: vec![ContentElement {
                    kind: ElementKind::Text,
                    content: "extracted text".to_string(),
                    metadata: serde_json::Value::Null,
                }],
            });

            if !self.skip_store_write.contains(&name) {
                written.push(name);
            }
        }

        self.store
            .insert_documents_with_lag(collection_name, written, self.lag)
            .await;

        Ok(outcome)
    }
}

fn write_files(dir: &TempDir, count: usize) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.path().join(format!("doc-{i}.pdf"));
            let mut file = std::fs::File::create(&path).expect("create test file");
            file.write_all(b"%PDF test payload").expect("write test file");
            path
        })
        .collect()
}

fn instant_policy(max_retries: u32) -> ValidationPolicy {
    ValidationPolicy {
        max_retries,
        retry_delay: Duration::ZERO,
        initial_delay: Duration::ZERO,
    }
}

fn sequential_config(files_per_batch: usize, max_retries: u32) -> OrchestratorConfig {
    OrchestratorConfig {
        tuning: BatchTuning {
            batch_mode: true,
            files_per_batch,
            execution_mode: ExecutionMode::Sequential,
        },
        validation_policy: instant_policy(max_retries),
    }
}

async fn store_with_collection() -> Arc<MemoryVectorStore> {
    let store = Arc::new(MemoryVectorStore::new());
    store.create_collection(COLLECTION).await;
    store
}

#[tokio::test]
async fn upload_accounts_for_every_file() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 5);
    let store = store_with_collection().await;
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(2, 1), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.total_documents, 5);
    assert_eq!(result.documents.len(), 5);
    assert!(result.failed_documents.is_empty());
    assert!(result.accounts_for_all_inputs());
    assert_eq!(result.message, "Document upload job successfully completed.");

    let doc = &result.documents[0];
    assert_eq!(doc.mime_type, "application/pdf");
    assert!(doc.size_bytes > 0);
    assert!(!doc.document_id.is_empty());
}

#[tokio::test]
async fn failed_batch_does_not_abort_the_job() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 6);
    let store = store_with_collection().await;
    // doc-2 and doc-3 form batch 2 of 3.
    let services = Arc::new(
        MockExtraction::new(store.clone()).failing_batches_containing("doc-2.pdf"),
    );
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(2, 1), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.documents.len(), 4);
    assert_eq!(result.failed_documents.len(), 2);
    assert!(result.accounts_for_all_inputs());

    let failed_names: Vec<&str> = result
        .failed_documents
        .iter()
        .map(|f| f.document_name.as_str())
        .collect();
    assert_eq!(failed_names, vec!["doc-2.pdf", "doc-3.pdf"]);
    assert!(result
        .failed_documents
        .iter()
        .all(|f| f.error_message.starts_with("Extraction failed:")));
}

#[tokio::test]
async fn lagging_store_passes_validation_within_the_budget() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 3);
    let store = store_with_collection().await;
    let services = Arc::new(MockExtraction::new(store.clone()).with_lag(2));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 5), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.documents.len(), 3);
    assert!(result.failed_documents.is_empty());
}

#[tokio::test]
async fn invisible_document_is_reported_exactly_once() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 3);
    let store = store_with_collection().await;
    let services = Arc::new(
        MockExtraction::new(store.clone()).skipping_store_write_for("doc-1.pdf"),
    );
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 3), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.failed_documents.len(), 1);
    assert_eq!(result.failed_documents[0].document_name, "doc-1.pdf");
    assert_eq!(result.failed_documents[0].error_message, INGESTION_INCOMPLETE);
    assert!(result.accounts_for_all_inputs());
}

#[tokio::test]
async fn per_file_extraction_failures_are_not_requeried() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 3);
    let store = store_with_collection().await;
    let services =
        Arc::new(MockExtraction::new(store.clone()).failing_file("doc-0.pdf"));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 1), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.failed_documents.len(), 1);
    assert_eq!(result.failed_documents[0].document_name, "doc-0.pdf");
    assert_eq!(result.failed_documents[0].error_message, "failed to parse document");
}

#[tokio::test]
async fn prevalidation_rejections_never_reach_extraction() {
    let dir = TempDir::new().expect("tempdir");
    let mut files = write_files(&dir, 1);
    files.push(dir.path().join("missing.pdf"));
    let unsupported = dir.path().join("notes.xyz");
    std::fs::write(&unsupported, b"data").expect("write unsupported file");
    files.push(unsupported);

    let store = store_with_collection().await;
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator = IngestionOrchestrator::new(
        sequential_config(4, 1),
        services.clone(),
        store.clone(),
    );

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload succeeds");

    assert_eq!(result.total_documents, 3);
    assert_eq!(result.documents.len(), 1);
    assert_eq!(result.failed_documents.len(), 2);
    assert!(result.accounts_for_all_inputs());

    let seen = services.files_seen.lock().await.clone();
    assert_eq!(seen, vec!["doc-0.pdf"]);
}

#[tokio::test]
async fn document_already_in_the_store_is_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 1);
    let store = store_with_collection().await;
    store
        .insert_documents(COLLECTION, vec!["doc-0.pdf".to_string()])
        .await;
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 1), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await
        .expect("upload returns a result");

    assert!(result.documents.is_empty());
    assert_eq!(result.failed_documents.len(), 1);
    assert!(result.failed_documents[0]
        .error_message
        .contains("already exists"));
    assert_eq!(
        result.message,
        "Document upload job failed. All files failed to validate. Check logs for details."
    );
}

#[tokio::test]
async fn missing_collection_is_a_validation_error() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 1);
    let store = Arc::new(MemoryVectorStore::new());
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 1), services, store.clone());

    let result = orchestrator
        .upload_documents(IngestionJob::new(files, COLLECTION))
        .await;

    assert!(matches!(result, Err(AppError::Validation(_))));
}

#[tokio::test]
async fn metadata_errors_are_reported_and_attached() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 2);
    let store = store_with_collection().await;
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator =
        IngestionOrchestrator::new(sequential_config(4, 1), services, store.clone());

    let job = IngestionJob::new(files, COLLECTION).with_custom_metadata(vec![
        CustomMetadata {
            filename: "doc-0.pdf".to_string(),
            metadata: serde_json::json!({"origin": "unit-test"}),
        },
        CustomMetadata {
            filename: "unknown.pdf".to_string(),
            metadata: serde_json::json!({}),
        },
    ]);

    let result = orchestrator
        .upload_documents(job)
        .await
        .expect("upload succeeds");

    assert_eq!(result.validation_errors.len(), 1);
    assert!(result.validation_errors[0]
        .error
        .contains("unknown.pdf is not provided in the ingestion request"));

    let tagged = result
        .documents
        .iter()
        .find(|doc| doc.document_name == "doc-0.pdf")
        .expect("doc-0 uploaded");
    assert_eq!(tagged.metadata, serde_json::json!({"origin": "unit-test"}));
}

#[tokio::test]
async fn cancellation_resolves_undispatched_batches() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 4);
    let store = store_with_collection().await;
    let flag = CancellationFlag::new();
    // The first extraction call flips the flag, so batch 2 never dispatches.
    let services = Arc::new(
        MockExtraction::new(store.clone()).cancelling_during_call(flag.clone()),
    );
    let orchestrator = IngestionOrchestrator::new(
        sequential_config(2, 1),
        services.clone(),
        store.clone(),
    );

    let result = orchestrator
        .upload_documents_with_cancellation(IngestionJob::new(files, COLLECTION), flag)
        .await
        .expect("upload returns a result");

    assert_eq!(services.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.documents.len(), 2);
    assert_eq!(result.failed_documents.len(), 2);
    assert!(result
        .failed_documents
        .iter()
        .all(|f| f.error_message == CANCELLED_REASON));
    assert!(result.accounts_for_all_inputs());
}

#[tokio::test]
async fn background_submission_is_observable_through_the_tracker() {
    let dir = TempDir::new().expect("tempdir");
    let files = write_files(&dir, 2);
    let store = store_with_collection().await;
    let services = Arc::new(MockExtraction::new(store.clone()));
    let orchestrator = Arc::new(IngestionOrchestrator::new(
        sequential_config(2, 1),
        services,
        store.clone(),
    ));
    let tracker = JobTracker::new();

    let job = IngestionJob::new(files, COLLECTION).background();
    let job_id = job.id.clone();
    let handle = Arc::clone(&orchestrator).submit_upload(&tracker, job).await;
    assert_eq!(handle.job_id, job_id);

    let result = handle.join().await.expect("background job succeeds");
    assert_eq!(result.documents.len(), 2);

    match tracker.status(&job_id).await {
        Some(JobState::Finished(finished)) => {
            assert!(finished.accounts_for_all_inputs());
        }
        other => panic!("expected finished job, got {other:?}"),
    }

    // A job id the tracker never saw stays unknown.
    assert!(tracker.status("no-such-job").await.is_none());
}
