//! Inference value objects - immutable result types for one request.
//!
//! These types represent the outputs of each pipeline stage:
//! - [`ModelResponse`] - One provider's answer (or typed failure)
//! - [`ExecutionResult`] - Outcome of sandboxing one code fragment
//! - [`InferenceResult`] - Complete result returned to the caller

use crate::core::provider::ProviderId;
use crate::judge::VerificationReport;
use serde::{Deserialize, Serialize};

/// Kind of failure a provider adapter reported.
///
/// `RateLimited` is a degradation signal, not a hard failure: the
/// coordinator still gathers from healthy providers. `CircuitOpen` means
/// the adapter short-circuited without a network attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFailureKind {
    Timeout,
    RateLimited,
    AuthFailed,
    Malformed,
    Network,
    CircuitOpen,
}

impl std::fmt::Display for ProviderFailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderFailureKind::Timeout => "timeout",
            ProviderFailureKind::RateLimited => "rate_limited",
            ProviderFailureKind::AuthFailed => "auth_failed",
            ProviderFailureKind::Malformed => "malformed",
            ProviderFailureKind::Network => "network",
            ProviderFailureKind::CircuitOpen => "circuit_open",
        };
        write!(f, "{s}")
    }
}

/// A typed provider failure attached to a [`ModelResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    pub kind: ProviderFailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(kind: ProviderFailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of executing one code fragment in the sandbox.
///
/// `success` reflects process completion without crash or timeout; a program
/// that runs and exits non-zero is a successful execution of an unsuccessful
/// program, so callers must inspect `exit_code` separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the process ran to completion (no crash, no timeout).
    pub success: bool,
    /// Process exit code (`-1` when the process never produced one).
    pub exit_code: i32,
    /// Captured standard output, up to the configured byte ceiling.
    pub stdout: String,
    /// Captured standard error, up to the configured byte ceiling.
    pub stderr: String,
    /// Wall-clock execution time in seconds.
    pub execution_time: f64,
    /// Set when captured output exceeded the byte ceiling and was discarded.
    #[serde(default)]
    pub truncated: bool,
}

impl ExecutionResult {
    /// A completed execution (exit code may still be non-zero).
    pub fn completed(exit_code: i32, stdout: String, stderr: String, execution_time: f64) -> Self {
        Self {
            success: true,
            exit_code,
            stdout,
            stderr,
            execution_time,
            truncated: false,
        }
    }

    /// A failed execution: crash, timeout, or sandbox-level error.
    pub fn failed(stderr: impl Into<String>, execution_time: f64) -> Self {
        Self {
            success: false,
            exit_code: -1,
            stdout: String::new(),
            stderr: stderr.into(),
            execution_time,
            truncated: false,
        }
    }

    pub fn with_truncated(mut self, truncated: bool) -> Self {
        self.truncated = truncated;
        self
    }

    /// True when the process both completed and exited zero.
    pub fn is_verified(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Response from a single provider for one request.
///
/// Invariant: a response carries either text or an error, never neither.
/// Execution results are attached after the sandbox stage, in fragment order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Which provider produced this response.
    pub provider: ProviderId,
    /// Concrete model identifier reported by the provider.
    pub model_name: String,
    /// Generated text (empty on failure).
    pub text: String,
    /// Latency of the provider call in seconds.
    pub latency: f64,
    /// Typed failure, when the provider errored or timed out.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ProviderFailure>,
    /// Sandbox outcomes for this response's fragments, in fragment order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub execution_results: Vec<ExecutionResult>,
}

impl ModelResponse {
    /// Creates a successful response.
    pub fn success(
        provider: ProviderId,
        model_name: impl Into<String>,
        text: impl Into<String>,
        latency: f64,
    ) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            text: text.into(),
            latency,
            error: None,
            execution_results: Vec::new(),
        }
    }

    /// Creates a failed response carrying the failure kind.
    pub fn failure(
        provider: ProviderId,
        model_name: impl Into<String>,
        failure: ProviderFailure,
        latency: f64,
    ) -> Self {
        Self {
            provider,
            model_name: model_name.into(),
            text: String::new(),
            latency,
            error: Some(failure),
            execution_results: Vec::new(),
        }
    }

    /// Returns `true` if the provider answered without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Iterate over executions that completed with exit code zero.
    pub fn verified_executions(&self) -> impl Iterator<Item = &ExecutionResult> {
        self.execution_results.iter().filter(|r| r.is_verified())
    }
}

/// Complete result of one gateway request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Tracing id of the originating request.
    pub request_id: String,
    /// All provider responses, in dispatch order.
    pub model_responses: Vec<ModelResponse>,
    /// The judge's selected answer, when verification ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_response: Option<ModelResponse>,
    /// Verification report, when verification ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification: Option<VerificationReport>,
    /// Total wall-clock latency for the request in seconds.
    pub total_latency: f64,
    /// Whether this result was served from the semantic cache.
    #[serde(default)]
    pub cached: bool,
}

impl InferenceResult {
    pub fn new(request_id: impl Into<String>, model_responses: Vec<ModelResponse>) -> Self {
        Self {
            request_id: request_id.into(),
            model_responses,
            selected_response: None,
            verification: None,
            total_latency: 0.0,
            cached: false,
        }
    }

    pub fn with_selection(
        mut self,
        selected: ModelResponse,
        verification: VerificationReport,
    ) -> Self {
        self.selected_response = Some(selected);
        self.verification = Some(verification);
        self
    }

    pub fn with_total_latency(mut self, seconds: f64) -> Self {
        self.total_latency = seconds;
        self
    }

    /// Marks this result as a cache hit.
    pub fn as_cached(mut self) -> Self {
        self.cached = true;
        self
    }

    /// Returns an iterator over only the successful provider responses.
    pub fn successful_responses(&self) -> impl Iterator<Item = &ModelResponse> {
        self.model_responses.iter().filter(|r| r.is_success())
    }
}
