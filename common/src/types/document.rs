use std::path::Path;

use chrono::{DateTime, Utc};
use mime_guess::from_path;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returns the basename used as a document's identity throughout a job.
pub fn document_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// A file that ended up outside the success bucket, with the human-readable
/// reason. A name appears at most once in any final failure list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDocument {
    pub document_name: String,
    pub error_message: String,
}

impl FailedDocument {
    pub fn new(document_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            error_message: error_message.into(),
        }
    }
}

/// Descriptor for a document that made it into the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub document_id: String,
    pub document_name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
    pub ingested_at: DateTime<Utc>,
}

impl UploadedDocument {
    pub fn new(path: &Path, size_bytes: u64, metadata: serde_json::Value) -> Self {
        Self {
            document_id: Uuid::new_v4().to_string(),
            document_name: document_name(path),
            size_bytes,
            mime_type: guess_mime_type(path),
            metadata,
            ingested_at: Utc::now(),
        }
    }
}

/// Guesses the MIME type based on the file extension.
fn guess_mime_type(path: &Path) -> String {
    from_path(path)
        .first_or(mime::APPLICATION_OCTET_STREAM)
        .to_string()
}
