//! Ollama adapter for locally hosted models
//!
//! Talks to a local Ollama daemon over `/api/generate` with streaming
//! disabled. No credentials; reachability is the only failure mode that
//! matters here.

use super::http::{check_status, map_transport};
use async_trait::async_trait;
use gateway_application::{CompletionGateway, ProviderError};
use gateway_domain::ProviderId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct OllamaGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl OllamaGateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            max_tokens,
            timeout,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[async_trait]
impl CompletionGateway for OllamaGateway {
    fn provider(&self) -> ProviderId {
        ProviderId::Ollama
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature,
                num_predict: self.max_tokens,
            },
        };

        debug!(model = %self.model, "sending generate request to ollama");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport(self.timeout, e))?;

        let body: GenerateResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        extract_text(body)
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// A missing or whitespace-only `response` field is malformed, not a
/// successful completion.
fn extract_text(body: GenerateResponse) -> Result<String, ProviderError> {
    if body.response.trim().is_empty() {
        return Err(ProviderError::Malformed(
            "empty response from ollama".to_string(),
        ));
    }
    Ok(body.response)
}
