//! Semantic cache - similarity-keyed response store
//!
//! Maps prompt embeddings to previously synthesized results. Lookup is a
//! nearest-neighbor search, not a dictionary lookup: the closest stored
//! embedding must reach the cosine-similarity threshold or the probe is a
//! miss. The cache is bounded and evicts least-recently-used entries;
//! entries also expire after a TTL. Returned results are clones, so a
//! later store never invalidates an already-returned entry.
//!
//! Lookups take only the read lock; recency and hit counters live in
//! atomics so concurrent probes proceed in parallel. Only insertion and
//! eviction serialize behind the write lock.

use gateway_domain::{Embedding, InferenceResult};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default similarity threshold for a hit (95% similar).
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.95;
/// Default entry lifetime (1 hour).
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
/// Default capacity before LRU eviction.
pub const DEFAULT_CAPACITY: usize = 256;

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub similarity_threshold: f32,
}

struct CacheEntry {
    embedding: Embedding,
    result: InferenceResult,
    inserted_at: Instant,
    /// Logical clock tick of the last touch, for LRU ordering.
    last_used: AtomicU64,
    hit_count: AtomicU64,
}

/// Bounded, similarity-keyed cache of synthesized inference results.
pub struct SemanticCache {
    entries: RwLock<Vec<CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
    clock: AtomicU64,
    similarity_threshold: f32,
    capacity: usize,
    ttl: Duration,
}

impl Default for SemanticCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_TTL)
    }
}

impl SemanticCache {
    pub fn new(capacity: usize, similarity_threshold: f32, ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            clock: AtomicU64::new(0),
            similarity_threshold,
            capacity: capacity.max(1),
            ttl,
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Nearest-neighbor probe. A hit requires the closest live entry to
    /// reach the similarity threshold; anything else is a miss, not an
    /// error. The returned result is a copy.
    pub async fn lookup(&self, embedding: &Embedding) -> Option<InferenceResult> {
        let now = Instant::now();
        let entries = self.entries.read().await;

        let mut best: Option<(&CacheEntry, f32)> = None;
        for entry in entries.iter() {
            if now.duration_since(entry.inserted_at) >= self.ttl {
                continue;
            }
            let similarity = embedding.cosine_similarity(&entry.embedding);
            if best.is_none_or(|(_, s)| similarity > s) {
                best = Some((entry, similarity));
            }
        }

        match best {
            Some((entry, similarity)) if similarity >= self.similarity_threshold => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                entry.last_used.store(self.tick(), Ordering::Relaxed);
                entry.hit_count.fetch_add(1, Ordering::Relaxed);
                info!(similarity, "semantic cache hit");
                Some(entry.result.clone())
            }
            _ => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!("semantic cache miss");
                None
            }
        }
    }

    /// Unconditional insert. Expired entries are purged first; if the
    /// cache is still at capacity the least-recently-used entry is
    /// evicted.
    pub async fn store(&self, embedding: Embedding, result: InferenceResult) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        entries.retain(|e| now.duration_since(e.inserted_at) < self.ttl);

        if entries.len() >= self.capacity {
            if let Some(lru) = entries
                .iter()
                .enumerate()
                .min_by_key(|(_, e)| e.last_used.load(Ordering::Relaxed))
                .map(|(i, _)| i)
            {
                entries.swap_remove(lru);
            }
        }

        entries.push(CacheEntry {
            embedding,
            result,
            inserted_at: now,
            last_used: AtomicU64::new(self.tick()),
            hit_count: AtomicU64::new(0),
        });
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.read().await;
        CacheStats {
            entries: entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            similarity_threshold: self.similarity_threshold,
        }
    }
}
