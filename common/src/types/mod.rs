pub mod batch;
pub mod document;
pub mod ingestion_job;
pub mod job_result;
