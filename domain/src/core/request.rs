//! Inference request value object
//!
//! An [`InferenceRequest`] is immutable after creation: the builder methods
//! consume and return the value, and the opaque [`RequestId`] is generated
//! exactly once so the same id threads through logs, cache entries, and the
//! final result.

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Monotonic discriminator so two requests created in the same millisecond
/// still get distinct ids.
static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Opaque request identifier used for tracing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a fresh id.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let seq = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        RequestId(format!("req_{millis}_{seq}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single inference request to the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceRequest {
    /// Tracing identifier, generated once at construction.
    pub id: RequestId,
    /// The prompt sent to every provider.
    pub prompt: String,
    /// Whether extracted code fragments should be executed in the sandbox.
    pub execute_code: bool,
    /// Whether the judge should verify and synthesize a final answer.
    pub verify: bool,
    /// Sampling temperature, in `0.0..=2.0`.
    pub temperature: f64,
}

impl InferenceRequest {
    /// Create a request with default settings (execute + verify, temperature 0.7).
    pub fn new(prompt: impl Into<String>) -> Result<Self, DomainError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(DomainError::EmptyPrompt);
        }

        Ok(Self {
            id: RequestId::generate(),
            prompt,
            execute_code: true,
            verify: true,
            temperature: 0.7,
        })
    }

    /// Set the sampling temperature, validating the `0.0..=2.0` range.
    pub fn with_temperature(mut self, temperature: f64) -> Result<Self, DomainError> {
        if !(0.0..=2.0).contains(&temperature) || temperature.is_nan() {
            return Err(DomainError::InvalidTemperature(temperature));
        }
        self.temperature = temperature;
        Ok(self)
    }

    /// Skip sandbox execution of extracted code.
    pub fn without_execution(mut self) -> Self {
        self.execute_code = false;
        self
    }

    /// Skip judging and synthesis.
    pub fn without_verification(mut self) -> Self {
        self.verify = false;
        self
    }
}
