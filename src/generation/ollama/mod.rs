#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::GenerationProvider;
use crate::config::{GenerationConfig, OllamaConfig};
use crate::http::{build_agent, get_text, post_json};

/// Completion client for the Ollama `/api/generate` endpoint
#[derive(Debug, Clone)]
pub struct OllamaGenerator {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(generation: &GenerationConfig, ollama: &OllamaConfig) -> Result<Self> {
        let base_url = ollama
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: generation.model.clone(),
            agent: build_agent(Duration::from_secs(generation.timeout_seconds)),
        })
    }

    #[inline]
    pub fn generate_blocking(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        debug!(
            "Generating with {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response: GenerateResponse = post_json(&self.agent, url.as_str(), &[], &request)
            .context("Failed to generate response")?;

        Ok(response.response)
    }

    fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/version")
            .context("Failed to build ping URL")?;
        get_text(&self.agent, url.as_str(), &[]).context("Failed to ping Ollama server")?;
        Ok(())
    }
}

#[async_trait]
impl GenerationProvider for OllamaGenerator {
    #[inline]
    fn model_id(&self) -> &str {
        &self.model
    }

    #[inline]
    async fn generate(&self, prompt: &str) -> Result<String> {
        let client = self.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || client.generate_blocking(&prompt))
            .await
            .context("Generation task failed to complete")?
    }

    #[inline]
    async fn health_check(&self) -> Result<()> {
        let client = self.clone();
        tokio::task::spawn_blocking(move || client.ping())
            .await
            .context("Health check task failed to complete")?
    }
}
