//! Feature-hashing prompt embedder
//!
//! Deterministic bag-of-words embedding: each lowercased token is FNV
//! hashed into a fixed-dimension vector of counts, which is then
//! L2-normalized so cosine similarity reduces to a dot product. No model
//! weights, no network, and identical prompts always produce identical
//! vectors, which is all the semantic cache requires.

use async_trait::async_trait;
use gateway_application::PromptEmbedder;
use gateway_domain::Embedding;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x100000001b3;

pub const DEFAULT_DIMENSION: usize = 256;

pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn build(&self, text: &str) -> Embedding {
        let mut vector = vec![0.0f32; self.dimension];

        for token in tokens(text) {
            let bucket = (fnv1a(token.as_bytes()) as usize) % self.dimension;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Embedding::new(vector)
    }
}

#[async_trait]
impl PromptEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Embedding {
        self.build(text)
    }
}

fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
