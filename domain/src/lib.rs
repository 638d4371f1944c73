//! Domain layer for inference-gateway
//!
//! This crate contains the core types and decision logic of the gateway:
//! request/response value objects, code-fragment extraction, the judge
//! (scoring, consensus, synthesis), the circuit-breaker state machine,
//! and embedding math. It has no dependencies on infrastructure or
//! runtime concerns.
//!
//! # Core Concepts
//!
//! ## Scatter-gather inference
//!
//! One prompt is dispatched to several independent completion providers.
//! Each answer is parsed for code fragments, the fragments are executed in
//! a sandbox, and the judge decides which answer to trust.
//!
//! ## Synthesis ladder
//!
//! The judge walks a strict precedence order (consensus, high confidence,
//! best available, fallback) and the first applicable strategy wins.

pub mod circuit;
pub mod core;
pub mod embedding;
pub mod extract;
pub mod inference;
pub mod judge;

// Re-export commonly used types
pub use circuit::{CircuitBreakerCore, CircuitState};
pub use core::{
    error::DomainError,
    provider::ProviderId,
    request::{InferenceRequest, RequestId},
};
pub use embedding::Embedding;
pub use extract::{CodeFragment, Fragments, extract_fragments, normalize_language};
pub use inference::{
    ExecutionResult, InferenceResult, ModelResponse, ProviderFailure, ProviderFailureKind,
};
pub use judge::{
    Judge, NormalizedOutput, OutputComparator, ProviderScore, SynthesisStrategy,
    VerificationReport,
};
