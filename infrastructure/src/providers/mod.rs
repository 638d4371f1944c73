//! Provider adapters and their resilience stack.

pub mod chat_completions;
pub mod gemini;
pub mod http;
pub mod ollama;
pub mod rate_limit;
pub mod resilience;

pub use chat_completions::ChatCompletionsGateway;
pub use gemini::GeminiGateway;
pub use ollama::OllamaGateway;
pub use rate_limit::RateLimiter;
pub use resilience::{CircuitBreaker, Resilient, RetryPolicy};

use crate::config::{FileConfig, FileProviderConfig, FileResilienceConfig};
use gateway_application::CompletionGateway;
use gateway_domain::ProviderId;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ProviderBuildError {
    #[error("no provider is enabled and configured")]
    NoneConfigured,

    #[error("failed to build http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Build the resilient gateway for every enabled provider, in dispatch
/// order. Providers missing their API key are skipped with a warning
/// rather than failing startup.
pub fn build_gateways(
    config: &FileConfig,
) -> Result<Vec<Arc<dyn CompletionGateway>>, ProviderBuildError> {
    let timeout = Duration::from_secs(config.providers.request_timeout_secs);
    let client = http::build_client(timeout)?;
    let resilience = &config.resilience;

    let mut gateways: Vec<Arc<dyn CompletionGateway>> = Vec::new();

    for provider in ProviderId::all().iter().copied() {
        let section = provider_section(config, provider);
        if !section.enabled {
            continue;
        }

        let gateway: Option<Arc<dyn CompletionGateway>> = match provider {
            ProviderId::Openai | ProviderId::Groq => {
                section.resolve_api_key().map(|api_key| {
                    wrap(
                        ChatCompletionsGateway::new(
                            provider,
                            client.clone(),
                            &section.base_url,
                            api_key,
                            &section.model,
                            section.max_tokens,
                            timeout,
                        ),
                        section,
                        resilience,
                        timeout,
                    )
                })
            }
            ProviderId::Gemini => section.resolve_api_key().map(|api_key| {
                wrap(
                    GeminiGateway::new(
                        client.clone(),
                        &section.base_url,
                        api_key,
                        &section.model,
                        section.max_tokens,
                        timeout,
                    ),
                    section,
                    resilience,
                    timeout,
                )
            }),
            ProviderId::Ollama => Some(wrap(
                OllamaGateway::new(
                    client.clone(),
                    &section.base_url,
                    &section.model,
                    section.max_tokens,
                    timeout,
                ),
                section,
                resilience,
                timeout,
            )),
        };

        match gateway {
            Some(gateway) => {
                info!(%provider, model = %section.model, "provider enabled");
                gateways.push(gateway);
            }
            None => warn!(
                %provider,
                env = %section.api_key_env,
                "provider enabled but no API key found, skipping"
            ),
        }
    }

    if gateways.is_empty() {
        return Err(ProviderBuildError::NoneConfigured);
    }
    Ok(gateways)
}

fn provider_section(config: &FileConfig, provider: ProviderId) -> &FileProviderConfig {
    match provider {
        ProviderId::Openai => &config.providers.openai,
        ProviderId::Groq => &config.providers.groq,
        ProviderId::Gemini => &config.providers.gemini,
        ProviderId::Ollama => &config.providers.ollama,
    }
}

/// The retry schedule shared by every provider, as configured.
pub fn retry_policy(resilience: &FileResilienceConfig) -> RetryPolicy {
    RetryPolicy {
        max_attempts: resilience.max_attempts,
        base_delay: Duration::from_secs(resilience.base_delay_secs),
        max_delay: Duration::from_secs(resilience.max_delay_secs),
    }
}

fn wrap<G: CompletionGateway + 'static>(
    inner: G,
    section: &FileProviderConfig,
    resilience: &FileResilienceConfig,
    attempt_timeout: Duration,
) -> Arc<dyn CompletionGateway> {
    let breaker = CircuitBreaker::new(
        resilience.failure_threshold,
        Duration::from_secs(resilience.cooldown_secs),
    );

    let mut resilient = Resilient::new(inner, retry_policy(resilience), breaker)
        .with_attempt_timeout(attempt_timeout);
    if let Some(rpm) = section.requests_per_minute {
        resilient = resilient.with_rate_limit(RateLimiter::per_minute(rpm));
    }
    Arc::new(resilient)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direct_keys_build_in_dispatch_order() {
        let mut config = FileConfig::default();
        config.providers.openai.enabled = true;
        config.providers.openai.api_key = Some("sk-a".to_string());
        config.providers.groq.api_key = Some("gsk-b".to_string());
        config.providers.gemini.api_key = Some("ai-c".to_string());
        config.providers.ollama.enabled = true;

        let gateways = build_gateways(&config).expect("build");
        let order: Vec<ProviderId> = gateways.iter().map(|g| g.provider()).collect();
        assert_eq!(
            order,
            vec![
                ProviderId::Openai,
                ProviderId::Groq,
                ProviderId::Gemini,
                ProviderId::Ollama
            ]
        );
    }

    #[test]
    fn test_keyless_provider_is_skipped() {
        let mut config = FileConfig::default();
        config.providers.groq.api_key = None;
        config.providers.groq.api_key_env = "NOT_A_REAL_KEY_VAR_98765".to_string();
        config.providers.gemini.api_key = Some("ai-c".to_string());

        let gateways = build_gateways(&config).expect("build");
        let order: Vec<ProviderId> = gateways.iter().map(|g| g.provider()).collect();
        assert_eq!(order, vec![ProviderId::Gemini]);
    }

    #[test]
    fn test_nothing_configured_is_an_error() {
        let mut config = FileConfig::default();
        config.providers.groq.enabled = false;
        config.providers.gemini.enabled = false;

        assert!(matches!(
            build_gateways(&config),
            Err(ProviderBuildError::NoneConfigured)
        ));
    }
}
