// Query module
// Answers a question from the nearest indexed documents

pub mod context;
pub mod prompt;


use std::sync::Arc;

use tracing::{debug, error, info};

use crate::document::Metadata;
use crate::embeddings::EmbeddingProvider;
use crate::generation::GenerationProvider;
use crate::store::{ScoredDocument, VectorStore};
use crate::{RagError, Result};

pub use context::{ContextField, ContextSchema, format_context};
pub use prompt::PromptTemplate;

pub const DEFAULT_TOP_K: usize = 5;
/// Largest neighbour count a single query may request
pub const MAX_TOP_K: usize = 100;

/// A generated answer and the documents it was grounded on
#[derive(Debug, Clone, PartialEq)]
pub struct RagAnswer {
    pub question: String,
    pub extra_context: String,
    /// Retrieved documents, nearest first
    pub documents: Vec<ScoredDocument>,
    pub answer: String,
}

impl RagAnswer {
    #[inline]
    pub fn metadata(&self) -> Vec<&Metadata> {
        self.documents
            .iter()
            .map(|result| &result.document.metadata)
            .collect()
    }
}

/// Embed, retrieve, format, prompt, generate
pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn GenerationProvider>,
    context: ContextSchema,
    prompt: PromptTemplate,
}

impl QueryPipeline {
    #[inline]
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            context: ContextSchema::default(),
            prompt: PromptTemplate::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_context_schema(mut self, context: ContextSchema) -> Self {
        self.context = context;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_prompt_template(mut self, prompt: PromptTemplate) -> Self {
        self.prompt = prompt;
        self
    }

    /// Answer `question` from the `top_k` nearest documents of `collection`.
    ///
    /// Blank questions are rejected before any provider is called. An
    /// empty or missing collection yields [`RagError::EmptyIndex`], while a
    /// populated collection with no admissible neighbour yields
    /// [`RagError::NoRelevantMatch`]. A collection indexed with a different
    /// embedding model is refused with [`RagError::ModelMismatch`] before the
    /// question is embedded.
    #[inline]
    pub async fn answer(
        &self,
        question: &str,
        extra_context: &str,
        top_k: usize,
        collection: &str,
    ) -> Result<RagAnswer> {
        match self.run(question, extra_context, top_k, collection).await {
            Ok(answer) => Ok(answer),
            Err(e) if e.kind().is_user_facing() => {
                info!("Question not answered: {}", e);
                Err(e)
            }
            Err(e) => {
                error!("Query against collection {} failed: {}", collection, e);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        question: &str,
        extra_context: &str,
        top_k: usize,
        collection: &str,
    ) -> Result<RagAnswer> {
        if question.trim().is_empty() {
            return Err(RagError::EmptyQuestion);
        }
        if !(1..=MAX_TOP_K).contains(&top_k) {
            return Err(RagError::InvalidTopK(top_k));
        }

        let info = self
            .store
            .collection_info(collection)
            .await
            .map_err(|e| RagError::Store(format!("{e:#}")))?;
        let info = match info {
            Some(info) if info.count > 0 => info,
            _ => return Err(RagError::EmptyIndex),
        };
        debug!(
            "Collection {} holds {} documents of dimension {}",
            collection, info.count, info.dimension
        );

        let model = self.embedder.model_id();
        if let Some(indexed_with) = info.model.as_deref() {
            if indexed_with != model {
                return Err(RagError::ModelMismatch {
                    indexed: indexed_with.to_string(),
                    query: model.to_string(),
                });
            }
        }

        let vector = self
            .embedder
            .embed(&[question.to_string()])
            .await
            .map_err(|e| RagError::Embedding(format!("{e:#}")))?
            .into_iter()
            .next()
            .ok_or_else(|| RagError::Embedding("Provider returned no vector".to_string()))?;

        if vector.len() != info.dimension {
            return Err(RagError::DimensionMismatch {
                expected: info.dimension,
                actual: vector.len(),
            });
        }

        info!("Searching for the {} nearest documents", top_k);
        let documents = self
            .store
            .query(collection, &vector, top_k)
            .await
            .map_err(|e| RagError::Store(format!("{e:#}")))?;

        if documents.is_empty() {
            return Err(RagError::NoRelevantMatch);
        }
        info!("Retrieved {} documents", documents.len());

        let context = format_context(&self.context, &documents);
        let prompt = self.prompt.render(question, extra_context, &context);
        debug!("Prompt assembled ({} bytes)", prompt.len());

        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|e| RagError::GenerationFailed(format!("{e:#}")))?;

        info!(
            "Answer generated with {} ({} bytes)",
            self.generator.model_id(),
            answer.len()
        );

        Ok(RagAnswer {
            question: question.to_string(),
            extra_context: extra_context.to_string(),
            documents,
            answer,
        })
    }
}
