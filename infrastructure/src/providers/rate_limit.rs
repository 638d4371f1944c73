//! Token-bucket rate limiter
//!
//! Free-tier providers enforce strict requests-per-minute quotas;
//! blowing through them converts into 429 storms and opened circuits.
//! The bucket refills continuously, so callers smear out instead of
//! bursting at window boundaries.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// Continuous-refill token bucket. `acquire` waits until a token is
/// available rather than failing.
pub struct RateLimiter {
    max_tokens: f64,
    refill_per_sec: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(max_rate: u32, period: Duration) -> Self {
        let max_tokens = f64::from(max_rate.max(1));
        Self {
            max_tokens,
            refill_per_sec: max_tokens / period.as_secs_f64(),
            bucket: Mutex::new(Bucket {
                tokens: max_tokens,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Requests-per-minute quota.
    pub fn per_minute(max_rate: u32) -> Self {
        Self::new(max_rate, Duration::from_secs(60))
    }

    /// Take one token, sleeping until the bucket refills if necessary.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.refill_per_sec)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
