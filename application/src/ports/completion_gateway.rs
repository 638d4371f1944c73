//! Completion gateway port
//!
//! Defines the interface for one remote completion provider. Adapters in
//! the infrastructure layer differ only in request/response shaping; the
//! coordinator depends on this trait alone.

use async_trait::async_trait;
use gateway_domain::{ProviderFailure, ProviderFailureKind, ProviderId};
use std::time::Duration;
use thiserror::Error;

/// Errors a provider adapter can report.
///
/// `Timeout` and `Network` are transient and eligible for retry with
/// backoff; the rest fail immediately. `RateLimited` is a degradation
/// signal so the coordinator can keep gathering from healthy providers.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("circuit open for provider {0}")]
    CircuitOpen(ProviderId),
}

impl ProviderError {
    /// Whether retrying with backoff can help.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Timeout(_) | ProviderError::Network(_))
    }

    /// The wire-facing failure kind.
    pub fn kind(&self) -> ProviderFailureKind {
        match self {
            ProviderError::Timeout(_) => ProviderFailureKind::Timeout,
            ProviderError::RateLimited(_) => ProviderFailureKind::RateLimited,
            ProviderError::AuthFailed(_) => ProviderFailureKind::AuthFailed,
            ProviderError::Malformed(_) => ProviderFailureKind::Malformed,
            ProviderError::Network(_) => ProviderFailureKind::Network,
            ProviderError::CircuitOpen(_) => ProviderFailureKind::CircuitOpen,
        }
    }

    /// Convert to the failure value attached to a `ModelResponse`.
    pub fn failure(&self) -> ProviderFailure {
        ProviderFailure::new(self.kind(), self.to_string())
    }
}

/// One remote completion provider.
///
/// Implementations own their retry/backoff policy and circuit breaker;
/// a call either returns generated text or a typed error, never both.
#[async_trait]
pub trait CompletionGateway: Send + Sync {
    /// Which provider this adapter fronts.
    fn provider(&self) -> ProviderId;

    /// Concrete model identifier used for completions.
    fn model_name(&self) -> &str;

    /// Request a completion for `prompt` at the given temperature.
    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError>;

    /// Cheap reachability probe; adapters without one report healthy.
    async fn health_check(&self) -> bool {
        true
    }
}
