use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::document_name;

/// Chunking parameters handed to the extraction service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitOptions {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 150,
        }
    }
}

/// Caller-supplied metadata for one file of an upload, keyed by filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMetadata {
    pub filename: String,
    pub metadata: serde_json::Value,
}

/// One upload request, owned by the orchestrator for its lifetime and
/// discarded once a final result has been produced or consumed.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    pub id: String,
    pub filepaths: Vec<PathBuf>,
    pub collection_name: String,
    pub split_options: SplitOptions,
    pub custom_metadata: Vec<CustomMetadata>,
    pub blocking: bool,
}

impl IngestionJob {
    pub fn new(filepaths: Vec<PathBuf>, collection_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            filepaths,
            collection_name: collection_name.into(),
            split_options: SplitOptions::default(),
            custom_metadata: Vec::new(),
            blocking: true,
        }
    }

    pub fn with_split_options(mut self, split_options: SplitOptions) -> Self {
        self.split_options = split_options;
        self
    }

    pub fn with_custom_metadata(mut self, custom_metadata: Vec<CustomMetadata>) -> Self {
        self.custom_metadata = custom_metadata;
        self
    }

    pub fn background(mut self) -> Self {
        self.blocking = false;
        self
    }

    /// Basenames of the submitted files, in submission order.
    pub fn file_names(&self) -> Vec<String> {
        self.filepaths
            .iter()
            .map(|path| document_name(path))
            .collect()
    }
}
