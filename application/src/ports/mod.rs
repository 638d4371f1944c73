//! Ports (interfaces) implemented by the infrastructure layer.

pub mod completion_gateway;
pub mod embedder;
pub mod sandbox;

pub use completion_gateway::{CompletionGateway, ProviderError};
pub use embedder::PromptEmbedder;
pub use sandbox::{ExecutionLimits, SandboxError, SandboxExecutor, SandboxStrategy};
