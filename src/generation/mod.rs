// Generation module
// Turns an assembled prompt into an answer using a hosted or local language model

pub mod gemini;
pub mod ollama;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::config::{GenerationBackend, GenerationConfig, OllamaConfig};

pub use gemini::GeminiGenerator;
pub use ollama::OllamaGenerator;

/// A prompt-to-text model
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    fn model_id(&self) -> &str;

    /// Generate a complete (non-streamed) response for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    async fn health_check(&self) -> Result<()>;
}

/// Build the generation provider selected in the configuration
#[inline]
pub fn from_config(
    generation: &GenerationConfig,
    ollama: &OllamaConfig,
) -> Result<Arc<dyn GenerationProvider>> {
    Ok(match generation.provider {
        GenerationBackend::Ollama => Arc::new(OllamaGenerator::new(generation, ollama)?),
        GenerationBackend::Gemini => Arc::new(GeminiGenerator::new(generation)?),
    })
}
