//! Infrastructure layer for inference-gateway
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: HTTP provider gateways with their resilience
//! stack, the sandbox executors, the hashing embedder, and configuration
//! file loading.

pub mod config;
pub mod embedding;
pub mod providers;
pub mod sandbox;

// Re-export commonly used types
pub use config::{ConfigLoader, ConfigValidationError, FileConfig};
pub use embedding::HashingEmbedder;
pub use providers::{
    ChatCompletionsGateway, CircuitBreaker, GeminiGateway, OllamaGateway, ProviderBuildError,
    RateLimiter, Resilient, RetryPolicy, build_gateways, retry_policy,
};
pub use sandbox::{ActiveSandbox, ContainerSandbox, SubprocessSandbox};
