#[cfg(test)]
mod tests;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::GenerationProvider;
use crate::config::GenerationConfig;
use crate::http::{build_agent, get_text, post_json};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Completion client for the Gemini `generateContent` API
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    base_url: Url,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

impl GeminiGenerator {
    /// Create a client from configuration; fails when no API key is
    /// configured or present in `GEMINI_API_KEY`
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| anyhow!("Gemini API key is not configured (set GEMINI_API_KEY)"))?;

        let base_url = Url::parse(&config.gemini_url)
            .with_context(|| format!("Invalid Gemini URL: {}", config.gemini_url))?;

        Ok(Self {
            base_url,
            model: config.model.clone(),
            api_key,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
        })
    }

    fn model_url(&self, suffix: &str) -> Result<Url> {
        self.base_url
            .join(&format!("/v1beta/models/{}{}", self.model, suffix))
            .context("Failed to build Gemini URL")
    }

    #[inline]
    pub fn generate_blocking(&self, prompt: &str) -> Result<String> {
        let url = self.model_url(":generateContent")?;

        debug!(
            "Generating with Gemini model {} (prompt length: {})",
            self.model,
            prompt.len()
        );

        let request = GenerateContentRequest {
            contents: [Content {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
        };

        let response: GenerateContentResponse = post_json(
            &self.agent,
            url.as_str(),
            &[(API_KEY_HEADER, &self.api_key)],
            &request,
        )
        .context("Failed to generate content")?;

        extract_text(response)
    }

    fn ping(&self) -> Result<()> {
        let url = self.model_url("")?;
        get_text(&self.agent, url.as_str(), &[(API_KEY_HEADER, &self.api_key)])
            .context("Failed to reach Gemini API")?;
        Ok(())
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        warn!("Gemini returned no answer: {}", reason);
        return Err(anyhow!("Gemini returned no answer: {}", reason));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.is_empty() {
        return Err(anyhow!("Gemini returned an empty answer"));
    }

    Ok(text)
}

#[async_trait]
impl GenerationProvider for GeminiGenerator {
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
