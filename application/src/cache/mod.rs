//! Semantic response cache.

pub mod semantic;

pub use semantic::{CacheStats, SemanticCache};
