use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, VectorStore};

#[derive(Default)]
struct CollectionState {
    visible: HashSet<String>,
    /// Documents that still have to miss `n` list calls before surfacing.
    lagging: HashMap<String, u32>,
}

/// In-memory store used by tests. A document inserted with a lag stays
/// invisible for exactly that many list calls, which models an eventually
/// consistent backend without real waiting.
#[derive(Default)]
pub struct MemoryVectorStore {
    collections: RwLock<HashMap<String, CollectionState>>,
}

impl MemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_collection(&self, name: &str) {
        self.collections
            .write()
            .await
            .entry(name.to_string())
            .or_default();
    }

    /// Inserts documents that are visible to the very next list call.
    pub async fn insert_documents<I>(&self, collection: &str, names: I)
    where
        I: IntoIterator<Item = String>,
    {
        let mut collections = self.collections.write().await;
        let state = collections.entry(collection.to_string()).or_default();
        state.visible.extend(names);
    }

    /// Inserts documents that miss exactly `lag` list calls before becoming
    /// visible.
    pub async fn insert_documents_with_lag<I>(&self, collection: &str, names: I, lag: u32)
    where
        I: IntoIterator<Item = String>,
    {
        let mut collections = self.collections.write().await;
        let state = collections.entry(collection.to_string()).or_default();
        for name in names {
            if lag == 0 {
                state.visible.insert(name);
            } else {
                state.lagging.insert(name, lag);
            }
        }
    }
}

#[async_trait]
impl VectorStore for MemoryVectorStore {
    async fn list_document_names(&self, collection: &str) -> Result<HashSet<String>, StoreError> {
        let mut collections = self.collections.write().await;
        let state = collections
            .get_mut(collection)
            .ok_or_else(|| StoreError::CollectionNotFound(collection.to_string()))?;

        let mut matured = Vec::new();
        for (name, remaining) in &mut state.lagging {
            if *remaining == 0 {
                matured.push(name.clone());
            } else {
                *remaining -= 1;
            }
        }
        for name in matured {
            state.lagging.remove(&name);
            state.visible.insert(name);
        }

        Ok(state.visible.clone())
    }

    async fn collection_exists(&self, collection: &str) -> Result<bool, StoreError> {
        Ok(self.collections.read().await.contains_key(collection))
    }
}
