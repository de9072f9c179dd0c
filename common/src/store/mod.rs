pub mod consistency;
pub mod http;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use std::collections::HashSet;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Store endpoint is not a valid URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Unexpected store response: {0}")]
    UnexpectedResponse(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
}

/// Read side of the vector store, as seen by the ingestion orchestrator.
///
/// The consistency validator only ever needs to answer two questions about
/// a collection: which document names are currently visible, and whether
/// the collection exists at all. Write paths belong to the extraction
/// service and are deliberately absent here.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Names of the documents currently visible in `collection`.
    async fn list_document_names(&self, collection: &str) -> Result<HashSet<String>, StoreError>;

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError>;
}
