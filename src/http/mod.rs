// Blocking JSON-over-HTTP helpers shared by the Ollama and Gemini clients


use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Build a `ureq` agent with a global request timeout.
///
/// Non-2xx statuses are surfaced as [`ureq::Error::StatusCode`] so callers
/// can report the status code.
#[inline]
pub fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

/// POST `body` as JSON and decode the JSON response into `R`.
///
/// Requests are sent exactly once; failures are classified into readable
/// messages and returned to the caller.
#[inline]
pub fn post_json<B, R>(agent: &ureq::Agent, url: &str, headers: &[(&str, &str)], body: &B) -> Result<R>
where
    B: Serialize,
    R: DeserializeOwned,
{
    let request_json = serde_json::to_string(body).context("Failed to serialize request body")?;

    debug!("POST {} ({} bytes)", url, request_json.len());

    let mut request = agent.post(url).header("Content-Type", "application/json");
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    let response_text = request
        .send(&request_json)
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(|e| describe_error(url, &e))?;

    serde_json::from_str(&response_text)
        .with_context(|| format!("Failed to parse response from {}", url))
}

/// GET `url` and return the response body.
#[inline]
pub fn get_text(agent: &ureq::Agent, url: &str, headers: &[(&str, &str)]) -> Result<String> {
    debug!("GET {}", url);

    let mut request = agent.get(url);
    for (name, value) in headers {
        request = request.header(*name, *value);
    }

    request
        .call()
        .and_then(|mut resp| resp.body_mut().read_to_string())
        .map_err(|e| describe_error(url, &e))
}

fn describe_error(url: &str, error: &ureq::Error) -> anyhow::Error {
    match error {
        ureq::Error::StatusCode(status) if *status >= 500 => {
            warn!("Server error (status {}) from {}", status, url);
            anyhow!("Server error: HTTP {}", status)
        }
        ureq::Error::StatusCode(status) => {
            warn!("Client error (status {}) from {}", status, url);
            anyhow!("Client error: HTTP {}", status)
        }
        ureq::Error::ConnectionFailed
        | ureq::Error::HostNotFound
        | ureq::Error::Timeout(_)
        | ureq::Error::Io(_) => {
            warn!("Transport error talking to {}: {}", url, error);
            anyhow!("Transport error: {}", error)
        }
        _ => {
            warn!("Request to {} failed: {}", url, error);
            anyhow!("Request error: {}", error)
        }
    }
}
