//! Sandbox executor port
//!
//! Defines the interface for running one extracted code fragment under
//! resource limits. Two isolation strategies exist (container preferred,
//! constrained subprocess as fallback); callers are indifferent to which
//! is active.

use async_trait::async_trait;
use gateway_domain::{CodeFragment, ExecutionResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Which isolation strategy is active for the process lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SandboxStrategy {
    /// Fresh network-disabled container per fragment.
    Container,
    /// Child process with OS-level resource limits.
    Subprocess,
}

impl std::fmt::Display for SandboxStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SandboxStrategy::Container => write!(f, "container"),
            SandboxStrategy::Subprocess => write!(f, "subprocess"),
        }
    }
}

/// Sandbox-level failures.
///
/// These never reach the coordinator as errors: the executor folds them
/// into an `ExecutionResult { success: false }` carrying the failure text.
/// `RuntimeUnavailable` can only occur during startup detection.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("resource limit exceeded: {0}")]
    ResourceExceeded(String),

    #[error("no sandbox runtime available: {0}")]
    RuntimeUnavailable(String),
}

/// Resource limits enforced on every fragment execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Wall-clock ceiling; the fragment is hard-killed past this bound.
    pub timeout: Duration,
    /// Memory ceiling in bytes.
    pub memory_bytes: u64,
    /// CPU ceiling as a fraction of cores (container) or seconds of CPU
    /// time per wall-clock timeout (subprocess rlimit).
    pub cpu_limit: f64,
    /// Captured stdout/stderr ceiling; further output is discarded and the
    /// result is flagged truncated.
    pub max_output_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            memory_bytes: 256 * 1024 * 1024,
            cpu_limit: 0.5,
            max_output_bytes: 1024 * 1024,
        }
    }
}

impl ExecutionLimits {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_memory_bytes(mut self, bytes: u64) -> Self {
        self.memory_bytes = bytes;
        self
    }
}

/// Executes one code fragment under the active isolation strategy.
///
/// Never fails to the caller: crashes, timeouts and sandbox errors are all
/// reported through the returned `ExecutionResult`.
#[async_trait]
pub trait SandboxExecutor: Send + Sync {
    /// The strategy fixed at startup.
    fn strategy(&self) -> SandboxStrategy;

    /// Run the fragment and report the structured outcome.
    async fn execute(&self, fragment: &CodeFragment, limits: &ExecutionLimits) -> ExecutionResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionLimits::default();
        assert_eq!(limits.timeout, Duration::from_secs(30));
        assert_eq!(limits.memory_bytes, 256 * 1024 * 1024);
        assert_eq!(limits.max_output_bytes, 1024 * 1024);
    }

    #[test]
    fn test_strategy_display() {
        assert_eq!(SandboxStrategy::Container.to_string(), "container");
        assert_eq!(SandboxStrategy::Subprocess.to_string(), "subprocess");
    }
}
