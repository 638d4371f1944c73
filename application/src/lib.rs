//! Application layer for inference-gateway
//!
//! This crate defines the ports (interfaces) the infrastructure layer
//! implements (completion gateways, the sandbox executor, the prompt
//! embedder) and the use cases that orchestrate them. The central use
//! case is [`RunInferenceUseCase`]: cache probe, scatter-gather across
//! providers, sandboxed execution, judging, and cache store.

pub mod cache;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use cache::{CacheStats, SemanticCache};
pub use ports::{
    completion_gateway::{CompletionGateway, ProviderError},
    embedder::PromptEmbedder,
    sandbox::{ExecutionLimits, SandboxError, SandboxExecutor, SandboxStrategy},
};
pub use use_cases::run_inference::{RunInferenceConfig, RunInferenceError, RunInferenceUseCase};
