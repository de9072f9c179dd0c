#![allow(clippy::missing_docs_in_private_items, clippy::result_large_err)]

pub mod orchestrator;
pub mod tracker;

pub use orchestrator::{
    ConsistencyValidator, ExecutionMode, ExtractionService, HttpExtractionService,
    IngestionOrchestrator, OrchestratorConfig,
};
pub use tracker::{CancellationFlag, JobHandle, JobState, JobTracker};
