use std::collections::HashSet;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{StoreError, VectorStore};

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    #[serde(default)]
    documents: Vec<DocumentEntry>,
    #[serde(default)]
    total_documents: usize,
}

#[derive(Debug, Deserialize)]
struct DocumentEntry {
    document_name: String,
}

#[derive(Debug, Deserialize)]
struct CollectionsResponse {
    #[serde(default)]
    collections: Vec<CollectionEntry>,
}

#[derive(Debug, Deserialize)]
struct CollectionEntry {
    collection_name: String,
}

/// Read adapter for the ingestor-facing document API: `GET /v1/documents`
/// lists the names visible in a collection, `GET /v1/collections` lists the
/// collections themselves.
pub struct HttpVectorStore {
    endpoint: Url,
    client: reqwest::Client,
}

impl HttpVectorStore {
    pub fn new(endpoint: &str) -> Result<Self, StoreError> {
        // Url::join drops the last path segment without a trailing slash.
        let normalized = if endpoint.ends_with('/') {
            endpoint.to_string()
        } else {
            format!("{endpoint}/")
        };

        Ok(Self {
            endpoint: Url::parse(&normalized)?,
            client: reqwest::Client::new(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, StoreError> {
        Ok(self.endpoint.join(path)?)
    }
}

#[async_trait]
impl VectorStore for HttpVectorStore {
    async fn list_document_names(&self, collection: &str) -> Result<HashSet<String>, StoreError> {
        let response = self
            .client
            .get(self.url("v1/documents")?)
            .query(&[("collection_name", collection)])
            .send()
            .await?
            .error_for_status()?;

        let payload: DocumentsResponse = response.json().await?;
        debug!(
            collection,
            total_documents = payload.total_documents,
            "listed store documents"
        );

        Ok(payload
            .documents
            .into_iter()
            .map(|entry| entry.document_name)
            .collect())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        let payload: CollectionsResponse = self
            .client
            .get(self.url("v1/collections")?)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(payload
            .collections
            .iter()
            .any(|entry| entry.collection_name == collection))
    }
}
