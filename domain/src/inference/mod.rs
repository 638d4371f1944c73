//! Inference value objects - immutable result types for one gateway request.

pub mod value_objects;

pub use value_objects::{
    ExecutionResult, InferenceResult, ModelResponse, ProviderFailure, ProviderFailureKind,
};
