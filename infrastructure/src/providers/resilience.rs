//! Resilience wrapper for provider adapters
//!
//! [`Resilient`] decorates any [`CompletionGateway`] with the full
//! fault-handling stack: an optional token-bucket rate limiter, a
//! per-attempt deadline, retry with exponential backoff for transient
//! errors, and a shared circuit breaker. The deadline is enforced here
//! rather than left to the caller so a hanging provider is recorded as a
//! breaker failure instead of silently cancelled. The breaker
//! short-circuits before any network attempt while open, so one dead
//! provider costs nothing per request.

use super::rate_limit::RateLimiter;
use async_trait::async_trait;
use gateway_application::{CompletionGateway, ProviderError};
use gateway_domain::{CircuitBreakerCore, CircuitState, ProviderId};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Exponential backoff schedule for transient failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1),
    /// capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Upper bound on one resilient call: every attempt running to its
    /// deadline plus every backoff sleep. Rate-limiter waits are not
    /// included. Callers that impose an outer deadline must allow at
    /// least this much, or retries can never finish inside it.
    pub fn budget(&self, attempt_timeout: Duration) -> Duration {
        let mut budget = attempt_timeout.saturating_mul(self.max_attempts.max(1));
        for attempt in 1..self.max_attempts {
            budget = budget.saturating_add(self.delay(attempt));
        }
        budget
    }
}

/// Thread-safe wrapper around the breaker state machine.
pub struct CircuitBreaker {
    core: Mutex<CircuitBreakerCore>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            core: Mutex::new(CircuitBreakerCore::new(failure_threshold, cooldown)),
        }
    }

    pub fn allow(&self) -> bool {
        self.lock().allow_request(Instant::now())
    }

    pub fn on_success(&self) {
        self.lock().record_success();
    }

    pub fn on_failure(&self) {
        self.lock().record_failure(Instant::now());
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CircuitBreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A provider adapter wrapped with rate limiting, retries, and a breaker.
pub struct Resilient<G> {
    inner: G,
    retry: RetryPolicy,
    breaker: CircuitBreaker,
    limiter: Option<RateLimiter>,
    attempt_timeout: Duration,
}

impl<G: CompletionGateway> Resilient<G> {
    pub fn new(inner: G, retry: RetryPolicy, breaker: CircuitBreaker) -> Self {
        Self {
            inner,
            retry,
            breaker,
            limiter: None,
            attempt_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_rate_limit(mut self, limiter: RateLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Deadline applied to each individual attempt. A hung attempt is cut
    /// off here and recorded as a timeout failure.
    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }
}

#[async_trait]
impl<G: CompletionGateway> CompletionGateway for Resilient<G> {
    fn provider(&self) -> ProviderId {
        self.inner.provider()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn complete(&self, prompt: &str, temperature: f64) -> Result<String, ProviderError> {
        let provider = self.inner.provider();

        if !self.breaker.allow() {
            info!(%provider, "circuit open, skipping provider");
            return Err(ProviderError::CircuitOpen(provider));
        }

        if let Some(limiter) = &self.limiter {
            limiter.acquire().await;
        }

        let mut attempt = 1;
        loop {
            let outcome = match tokio::time::timeout(
                self.attempt_timeout,
                self.inner.complete(prompt, temperature),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ProviderError::Timeout(self.attempt_timeout)),
            };

            match outcome {
                Ok(text) => {
                    self.breaker.on_success();
                    return Ok(text);
                }
                Err(error) if error.is_transient() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.delay(attempt);
                    warn!(%provider, %error, attempt, ?delay, "transient failure, retrying");
                    attempt += 1;
                    tokio::time::sleep(delay).await;
                }
                Err(error) => {
                    self.breaker.on_failure();
                    return Err(error);
                }
            }
        }
    }

    async fn health_check(&self) -> bool {
        self.inner.health_check().await
    }
}
