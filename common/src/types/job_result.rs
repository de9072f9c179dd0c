use serde::{Deserialize, Serialize};

use super::document::{FailedDocument, UploadedDocument};

/// A custom-metadata entry that did not validate against the upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

/// Final aggregate for one ingestion job. Every originally submitted file
/// ends up in exactly one of `documents` or `failed_documents`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub message: String,
    pub total_documents: usize,
    pub documents: Vec<UploadedDocument>,
    pub failed_documents: Vec<FailedDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<ValidationError>,
}

impl JobResult {
    /// Result for a job that never reached extraction.
    pub fn failure(
        message: impl Into<String>,
        total_documents: usize,
        failed_documents: Vec<FailedDocument>,
        validation_errors: Vec<ValidationError>,
    ) -> Self {
        Self {
            message: message.into(),
            total_documents,
            documents: Vec::new(),
            failed_documents,
            validation_errors,
        }
    }

    /// Accounting invariant: successes plus failures cover the whole input.
    pub fn accounts_for_all_inputs(&self) -> bool {
        self.documents.len() + self.failed_documents.len() == self.total_documents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_accounts_for_rejected_files() {
        let result = JobResult::failure(
            "Document upload job failed. All files failed to validate. Check logs for details.",
            2,
            vec![
                FailedDocument::new("a.pdf", "File a.pdf does not exist"),
                FailedDocument::new("b.xyz", "Unsupported file type"),
            ],
            Vec::new(),
        );

        assert!(result.documents.is_empty());
        assert!(result.accounts_for_all_inputs());
    }
}
