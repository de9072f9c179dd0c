use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::document::{document_name, FailedDocument};

/// One contiguous slice of an ingestion job's files, processed as a unit.
/// Numbering starts at 1 and follows submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub number: usize,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Structured,
}

/// A structured content element produced by the extraction service, tagged
/// with its document type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentElement {
    pub kind: ElementKind,
    pub content: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Extraction output for one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedDocument {
    pub source_name: String,
    pub elements: Vec<ContentElement>,
}

/// Outcome of processing one batch, owned by the executor until merged.
#[derive(Debug, Clone, Default)]
pub struct BatchResult {
    pub number: usize,
    pub documents: Vec<ExtractedDocument>,
    pub failures: Vec<FailedDocument>,
}

impl BatchResult {
    /// A batch whose extraction call failed wholesale: every file in the
    /// batch is recorded as failed, nothing is dropped.
    pub fn all_failed(batch: &Batch, reason: &str) -> Self {
        Self {
            number: batch.number,
            documents: Vec::new(),
            failures: batch
                .files
                .iter()
                .map(|path| FailedDocument::new(document_name(path), reason))
                .collect(),
        }
    }
}
