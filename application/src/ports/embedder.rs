//! Prompt embedder port
//!
//! The semantic cache keys entries by an embedding of the prompt. How that
//! vector is produced is an adapter concern; the default infrastructure
//! implementation is a deterministic feature-hashing embedder, but a
//! remote embedding service can stand behind the same port.

use async_trait::async_trait;
use gateway_domain::Embedding;

/// Produces a fixed-dimension embedding for a prompt.
///
/// Must be deterministic for equal input within one process lifetime, or
/// cache lookups degrade to misses.
#[async_trait]
pub trait PromptEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Embedding;
}
