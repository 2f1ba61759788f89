
use std::collections::HashMap;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollectionInfo, EmbeddedDocument, ScoredDocument, VectorStore, admissible};
use crate::document::Document;

#[derive(Debug, Default)]
struct Collection {
    dimension: usize,
    model: Option<String>,
    entries: Vec<EmbeddedDocument>,
}

/// In-process vector store with brute-force squared L2 search.
///
/// Suited to tests and small datasets. Ties keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
    max_distance: Option<f32>,
}

impl MemoryStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop neighbours farther than `max_distance` from query results
    #[inline]
    #[must_use]
    pub fn with_max_distance(mut self, max_distance: Option<f32>) -> Self {
        self.max_distance = max_distance;
        self
    }
}

fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[async_trait]
impl VectorStore for MemoryStore {
    #[inline]
    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).map(|stored| CollectionInfo {
            name: collection.to_string(),
            count: stored.entries.len(),
            dimension: stored.dimension,
            model: stored.model.clone(),
        }))
    }

    #[inline]
    async fn delete_collection(&self, collection: &str) -> Result<()> {
        if self.collections.write().await.remove(collection).is_some() {
            debug!("Deleted in-memory collection {}", collection);
        }
        Ok(())
    }

    #[inline]
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        if collections.contains_key(collection) {
            return Err(anyhow!("Collection '{}' already exists", collection));
        }
        collections.insert(
            collection.to_string(),
            Collection {
                dimension,
                ..Collection::default()
            },
        );
        Ok(())
    }

    #[inline]
    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| anyhow!("Collection '{}' does not exist", collection))?;

        if let Some(bad) = documents
            .iter()
            .find(|entry| entry.vector.len() != stored.dimension)
        {
            return Err(anyhow!(
                "Vector for {} has dimension {}, collection expects {}",
                bad.document.id,
                bad.vector.len(),
                stored.dimension
            ));
        }

        for entry in documents {
            match stored
                .entries
                .iter_mut()
                .find(|existing| existing.document.id == entry.document.id)
            {
                Some(existing) => *existing = entry,
                None => stored.entries.push(entry),
            }
        }
        stored.model = Some(model.to_string());

        Ok(())
    }

    #[inline]
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let collections = self.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| anyhow!("Collection '{}' does not exist", collection))?;

        if vector.len() != stored.dimension {
            return Err(anyhow!(
                "Query vector has dimension {}, collection expects {}",
                vector.len(),
                stored.dimension
            ));
        }

        let mut scored: Vec<ScoredDocument> = stored
            .entries
            .iter()
            .map(|entry| ScoredDocument {
                document: entry.document.clone(),
                distance: squared_l2(vector, &entry.vector),
            })
            .collect();
        scored.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        scored.truncate(top_k);

        Ok(admissible(scored, self.max_distance))
    }

    #[inline]
    async fn sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|stored| {
                stored
                    .entries
                    .iter()
                    .take(limit)
                    .map(|entry| entry.document.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}
