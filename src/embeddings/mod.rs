// Embeddings module
// Maps batches of text onto fixed-dimension vectors

pub mod ollama;

use anyhow::Result;
use async_trait::async_trait;

pub use ollama::OllamaEmbedder;

/// A text-to-vector model.
///
/// Every vector returned for a given [`model_id`](EmbeddingProvider::model_id)
/// must have the same dimension.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Identity of the model producing the vectors, recorded with each collection
    fn model_id(&self) -> &str;

    /// Embed every text, returning one vector per input in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Verify the backend is reachable and serves the configured model.
    async fn health_check(&self) -> Result<()>;
}
