//! OpenAI-compatible chat-completions adapter
//!
//! OpenAI and Groq expose the same `/chat/completions` surface, so one
//! adapter covers both; only the base URL, credentials, and provider tag
//! differ.

use super::http::{check_status, map_transport};
use async_trait::async_trait;
use gateway_application::{CompletionGateway, ProviderError};
use gateway_domain::ProviderId;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct ChatCompletionsGateway {
    provider: ProviderId,
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
}

impl ChatCompletionsGateway {
    pub fn new(
        provider: ProviderId,
        client: reqwest::Client,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            timeout,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl CompletionGateway for ChatCompletionsGateway {
    fn provider(&self) -> ProviderId {
        self.provider
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            max_tokens: self.max_tokens,
        };

        debug!(provider = %self.provider, model = %self.model, "sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_transport(self.timeout, e))?;

        let body: ChatResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        extract_text(body)
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/models", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// A response with no choices or only whitespace text is malformed, not
/// a successful completion.
fn extract_text(body: ChatResponse) -> Result<String, ProviderError> {
    let text = body
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content)
        .ok_or_else(|| ProviderError::Malformed("response carried no choices".to_string()))?;
    if text.trim().is_empty() {
        return Err(ProviderError::Malformed(
            "response text was empty".to_string(),
        ));
    }
    Ok(text)
}
