// Indexer module
// Rebuilds a collection from a data source: rows to documents to embeddings


use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::document::build_document;
use crate::embeddings::EmbeddingProvider;
use crate::source::DataSource;
use crate::store::{EmbeddedDocument, VectorStore};
use crate::{RagError, Result};

pub const DEFAULT_ID_PREFIX: &str = "doc_";

/// Outcome of a successful rebuild
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    pub collection: String,
    /// Source table the records were read from
    pub table: String,
    pub total_documents: usize,
    pub columns: Vec<String>,
    pub model: String,
    pub indexed_at: DateTime<Utc>,
}

/// Full (destructive) rebuild of a collection from a data source
pub struct Indexer {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    id_prefix: String,
}

impl Indexer {
    #[inline]
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, store: Arc<dyn VectorStore>) -> Self {
        Self {
            embedder,
            store,
            id_prefix: DEFAULT_ID_PREFIX.to_string(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_id_prefix(mut self, id_prefix: impl Into<String>) -> Self {
        self.id_prefix = id_prefix.into();
        self
    }

    /// Replace `collection` with one document per source record.
    ///
    /// The previous collection is deleted in full before the new one is
    /// created. A failure part-way may leave the collection empty or partly
    /// filled; running the rebuild again is the recovery.
    #[inline]
    pub async fn build_index(
        &self,
        source: &dyn DataSource,
        collection: &str,
    ) -> Result<IndexSummary> {
        match self.rebuild(source, collection).await {
            Ok(summary) => Ok(summary),
            Err(e) => {
                error!("Indexing of collection {} failed: {}", collection, e);
                Err(e)
            }
        }
    }

    async fn rebuild(&self, source: &dyn DataSource, collection: &str) -> Result<IndexSummary> {
        info!("Fetching records for collection {}", collection);
        let records = source
            .fetch_records()
            .await
            .map_err(|e| RagError::DataSource(format!("{e:#}")))?;

        if records.is_empty() {
            return Err(RagError::EmptyDataSource);
        }

        info!(
            "Building {} documents from table {} (columns: {:?})",
            records.len(),
            records.table,
            records.columns
        );

        let documents: Vec<_> = records
            .rows
            .iter()
            .enumerate()
            .map(|(index, row)| build_document(&self.id_prefix, index, &records.columns, row))
            .collect();
        let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();

        let model = self.embedder.model_id().to_string();
        info!("Embedding {} documents with {}", texts.len(), model);
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| RagError::Embedding(format!("{e:#}")))?;

        let dimension = uniform_dimension(&vectors, texts.len())?;
        debug!("Embeddings have {} dimensions", dimension);

        let existing = self
            .store
            .collection_info(collection)
            .await
            .map_err(store_error)?;
        if let Some(info) = existing {
            warn!(
                "Collection {} already holds {} documents, deleting before rebuild",
                collection, info.count
            );
            self.store
                .delete_collection(collection)
                .await
                .map_err(store_error)?;
        }

        self.store
            .create_collection(collection, dimension)
            .await
            .map_err(store_error)?;

        let total_documents = documents.len();
        let entries = documents
            .into_iter()
            .zip(vectors)
            .map(|(document, vector)| EmbeddedDocument { document, vector })
            .collect();
        self.store
            .upsert(collection, &model, entries)
            .await
            .map_err(store_error)?;

        info!(
            "Indexed {} documents into collection {}",
            total_documents, collection
        );

        Ok(IndexSummary {
            collection: collection.to_string(),
            table: records.table,
            total_documents,
            columns: records.columns,
            model,
            indexed_at: Utc::now(),
        })
    }
}

fn store_error(e: anyhow::Error) -> RagError {
    RagError::Store(format!("{e:#}"))
}

/// One vector per text, all of the same non-zero dimension
fn uniform_dimension(vectors: &[Vec<f32>], expected: usize) -> Result<usize> {
    if vectors.len() != expected {
        return Err(RagError::Embedding(format!(
            "Provider returned {} vectors for {} texts",
            vectors.len(),
            expected
        )));
    }

    let dimension = vectors.first().map_or(0, Vec::len);
    if dimension == 0 {
        return Err(RagError::Embedding(
            "Provider returned empty vectors".to_string(),
        ));
    }

    if let Some(odd) = vectors.iter().find(|vector| vector.len() != dimension) {
        return Err(RagError::DimensionMismatch {
            expected: dimension,
            actual: odd.len(),
        });
    }

    Ok(dimension)
}
