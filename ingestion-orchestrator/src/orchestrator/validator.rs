use std::{
    collections::HashSet,
    sync::atomic::{AtomicU32, Ordering},
};

use common::{
    store::{consistency::ValidationPolicy, VectorStore},
    types::document::FailedDocument,
};
use tokio::time::sleep;
use tokio_retry::{strategy::FixedInterval, Retry};
use tracing::{debug, info, warn};

pub const INGESTION_INCOMPLETE: &str = "Ingestion did not complete successfully";

/// Confirms that presumptively ingested documents are actually visible in
/// the store before the job declares success. Backends that apply writes
/// asynchronously get a retry budget; immediately consistent backends get a
/// single mandatory check.
pub struct ConsistencyValidator<'a> {
    store: &'a dyn VectorStore,
    policy: ValidationPolicy,
}

impl<'a> ConsistencyValidator<'a> {
    pub fn new(store: &'a dyn VectorStore, policy: ValidationPolicy) -> Self {
        Self { store, policy }
    }

    /// Polls the collection until every expected name is visible or the
    /// retry budget runs out. Names already recorded as failed by earlier
    /// stages are never re-queried or duplicated. Returns the documents
    /// that never surfaced, each exactly once.
    #[tracing::instrument(skip_all, fields(collection = %collection, expected = expected.len()))]
    pub async fn confirm_visibility(
        &self,
        collection: &str,
        expected: &[String],
        already_failed: &HashSet<String>,
    ) -> Vec<FailedDocument> {
        let pending: Vec<String> = expected
            .iter()
            .filter(|name| !already_failed.contains(*name))
            .cloned()
            .collect();

        if pending.is_empty() {
            debug!("no documents awaiting visibility confirmation");
            return Vec::new();
        }

        if !self.policy.initial_delay.is_zero() {
            info!(
                delay_secs = self.policy.initial_delay.as_secs(),
                "waiting before the first visibility check to let indexing begin"
            );
            sleep(self.policy.initial_delay).await;
        }

        let max_attempts = self.policy.max_retries.max(1);
        let strategy = FixedInterval::new(self.policy.retry_delay)
            .take((max_attempts as usize).saturating_sub(1));
        let attempt = AtomicU32::new(0);

        let outcome = Retry::spawn(strategy, || {
            let current = attempt.fetch_add(1, Ordering::Relaxed) + 1;
            self.poll_missing(collection, &pending, current, max_attempts)
        })
        .await;

        match outcome {
            Ok(()) => Vec::new(),
            Err(missing) => {
                warn!(
                    missing = missing.len(),
                    attempts = max_attempts,
                    "documents never became visible in the store"
                );
                missing
                    .into_iter()
                    .map(|name| FailedDocument::new(name, INGESTION_INCOMPLETE))
                    .collect()
            }
        }
    }

    async fn poll_missing(
        &self,
        collection: &str,
        pending: &[String],
        attempt: u32,
        max_attempts: u32,
    ) -> Result<(), Vec<String>> {
        // A failed store query counts as "nothing visible" for this
        // attempt; the retry budget decides whether that turns into a
        // failure.
        let visible = match self.store.list_document_names(collection).await {
            Ok(visible) => visible,
            Err(err) => {
                warn!(attempt, error = %err, "store query failed during visibility check");
                HashSet::new()
            }
        };

        let missing: Vec<String> = pending
            .iter()
            .filter(|name| !visible.contains(name.as_str()))
            .cloned()
            .collect();

        if missing.is_empty() {
            info!(
                attempt,
                confirmed = pending.len(),
                "all documents visible in the store"
            );
            Ok(())
        } else {
            debug!(
                attempt,
                max_attempts,
                missing = missing.len(),
                "documents not yet visible in the store"
            );
            Err(missing)
        }
    }
}
