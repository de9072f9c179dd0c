use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use common::{error::AppError, types::job_result::JobResult};
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{info, warn};

/// Cooperative cancellation signal shared between a job handle and the
/// batch executor. Cancelling never interrupts an in-flight batch; it only
/// stops further batches from being dispatched.
#[derive(Clone, Debug, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Observable state of a submitted job. Only terminal states carry a
/// payload; a job that is still running is never reported as ingested.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Pending,
    Running,
    Finished(JobResult),
    Failed(String),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Finished(_) | JobState::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "Pending",
            JobState::Running => "Running",
            JobState::Finished(_) => "Finished",
            JobState::Failed(_) => "Failed",
        }
    }
}

/// Handle to a background upload. The caller can await the result, cancel
/// the remaining work, or simply drop the handle; the job keeps running and
/// its state stays observable through the tracker either way.
pub struct JobHandle {
    pub job_id: String,
    cancellation: CancellationFlag,
    handle: JoinHandle<Result<JobResult, AppError>>,
}

impl JobHandle {
    pub fn cancel(&self) {
        info!(job_id = %self.job_id, "cancellation requested for ingestion job");
        self.cancellation.cancel();
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancellation.clone()
    }

    pub async fn join(self) -> Result<JobResult, AppError> {
        self.handle.await?
    }
}

/// Keeps status records for background upload jobs. Submission hands back
/// an explicit [`JobHandle`] instead of detaching the task.
#[derive(Default, Clone)]
pub struct JobTracker {
    states: Arc<RwLock<HashMap<String, JobState>>>,
}

impl JobTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit<F>(
        &self,
        job_id: String,
        cancellation: CancellationFlag,
        job: F,
    ) -> JobHandle
    where
        F: Future<Output = Result<JobResult, AppError>> + Send + 'static,
    {
        self.states
            .write()
            .await
            .insert(job_id.clone(), JobState::Pending);

        let states = Arc::clone(&self.states);
        let task_id = job_id.clone();
        let handle = tokio::spawn(async move {
            states
                .write()
                .await
                .insert(task_id.clone(), JobState::Running);

            let result = job.await;
            let next = match &result {
                Ok(job_result) => JobState::Finished(job_result.clone()),
                Err(err) => {
                    warn!(job_id = %task_id, error = %err, "background ingestion job failed");
                    JobState::Failed(err.to_string())
                }
            };
            states.write().await.insert(task_id, next);

            result
        });

        JobHandle {
            job_id,
            cancellation,
            handle,
        }
    }

    pub async fn status(&self, job_id: &str) -> Option<JobState> {
        self.states.read().await.get(job_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    fn empty_result(message: &str) -> JobResult {
        JobResult {
            message: message.to_string(),
            total_documents: 0,
            documents: Vec::new(),
            failed_documents: Vec::new(),
            validation_errors: Vec::new(),
        }
    }

    #[tokio::test]
    async fn submitted_job_reaches_finished_state() {
        let tracker = JobTracker::new();
        let handle = tracker
            .submit("job-1".to_string(), CancellationFlag::new(), async {
                Ok(empty_result("done"))
            })
            .await;

        let result = handle.join().await.expect("job succeeds");
        assert_eq!(result.message, "done");

        match tracker.status("job-1").await {
            Some(JobState::Finished(job_result)) => assert_eq!(job_result.message, "done"),
            other => panic!("expected finished state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_job_surfaces_error_message() {
        let tracker = JobTracker::new();
        let handle = tracker
            .submit("job-2".to_string(), CancellationFlag::new(), async {
                Err(AppError::Processing("extraction exploded".to_string()))
            })
            .await;

        let result = handle.join().await;
        assert!(result.is_err());

        match tracker.status("job-2").await {
            Some(JobState::Failed(message)) => {
                assert!(message.contains("extraction exploded"));
            }
            other => panic!("expected failed state, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dropped_handle_leaves_job_observable() {
        let tracker = JobTracker::new();
        let handle = tracker
            .submit("job-3".to_string(), CancellationFlag::new(), async {
                sleep(Duration::from_millis(10)).await;
                Ok(empty_result("done"))
            })
            .await;
        drop(handle);

        // The task keeps running without its handle.
        for _ in 0..50 {
            if let Some(state) = tracker.status("job-3").await {
                if state.is_terminal() {
                    assert_eq!(state.as_str(), "Finished");
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
        panic!("job never reached a terminal state");
    }

    #[tokio::test]
    async fn cancel_sets_the_shared_flag() {
        let tracker = JobTracker::new();
        let flag = CancellationFlag::new();
        let observed = flag.clone();
        let handle = tracker
            .submit("job-4".to_string(), flag, async move {
                while !observed.is_cancelled() {
                    sleep(Duration::from_millis(5)).await;
                }
                Ok(empty_result("stopped early"))
            })
            .await;

        handle.cancel();
        let result = handle.join().await.expect("job finishes after cancel");
        assert_eq!(result.message, "stopped early");
    }
}
