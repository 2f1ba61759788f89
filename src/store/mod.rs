// Vector store module
// Named collections of embedded documents with nearest-neighbour search

pub mod lance;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::document::Document;

pub use lance::LanceStore;
pub use memory::MemoryStore;

/// A document together with its embedding
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedDocument {
    pub document: Document,
    pub vector: Vec<f32>,
}

/// A retrieved document and its distance to the query vector
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub distance: f32,
}

/// State of an existing collection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub count: usize,
    pub dimension: usize,
    /// Embedding model recorded at index time, if any document is stored
    pub model: Option<String>,
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// `None` when the collection does not exist
    async fn collection_info(&self, collection: &str) -> Result<Option<CollectionInfo>>;

    /// Remove the collection and everything in it. Missing collections are
    /// not an error.
    async fn delete_collection(&self, collection: &str) -> Result<()>;

    /// Create an empty collection for vectors of `dimension`
    async fn create_collection(&self, collection: &str, dimension: usize) -> Result<()>;

    /// Insert documents in one bulk call, replacing any with the same id
    async fn upsert(
        &self,
        collection: &str,
        model: &str,
        documents: Vec<EmbeddedDocument>,
    ) -> Result<()>;

    /// Up to `top_k` nearest documents by ascending distance. Neighbours the
    /// store deems inadmissible are left out, so fewer (or zero) results may
    /// come back from a non-empty collection.
    async fn query(
        &self,
        collection: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredDocument>>;

    /// Up to `limit` stored documents in storage order
    async fn sample(&self, collection: &str, limit: usize) -> Result<Vec<Document>>;
}

/// Keep only neighbours within `max_distance`
#[inline]
pub fn admissible(results: Vec<ScoredDocument>, max_distance: Option<f32>) -> Vec<ScoredDocument> {
    match max_distance {
        Some(bound) => results
            .into_iter()
            .filter(|result| result.distance <= bound)
            .collect(),
        None => results,
    }
}
