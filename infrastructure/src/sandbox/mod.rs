//! Sandboxed execution of extracted code fragments.
//!
//! Two isolation strategies implement the same executor port: a fresh
//! network-disabled container per fragment when a container runtime is
//! present, and a resource-limited child process otherwise. The strategy
//! is fixed once at startup.

pub mod container;
pub mod subprocess;

pub use container::ContainerSandbox;
pub use subprocess::SubprocessSandbox;

use crate::config::FileSandboxConfig;
use async_trait::async_trait;
use gateway_application::{ExecutionLimits, SandboxError, SandboxExecutor, SandboxStrategy};
use gateway_domain::{CodeFragment, ExecutionResult};
use tracing::{info, warn};

/// Interpreter binary for a fragment language.
pub(crate) fn interpreter(language: &str) -> Option<&'static str> {
    match language {
        "python" => Some("python3"),
        "javascript" => Some("node"),
        "bash" => Some("bash"),
        _ => None,
    }
}

/// Scratch-file suffix for a fragment language.
pub(crate) fn file_suffix(language: &str) -> &'static str {
    match language {
        "python" => ".py",
        "javascript" => ".js",
        "bash" => ".sh",
        _ => ".txt",
    }
}

/// Decode captured output up to `limit` bytes, flagging truncation.
pub(crate) fn capture_output(bytes: &[u8], limit: usize) -> (String, bool) {
    let truncated = bytes.len() > limit;
    let kept = &bytes[..bytes.len().min(limit)];
    (String::from_utf8_lossy(kept).into_owned(), truncated)
}

/// The strategy chosen at startup, dispatching to the live executor.
pub enum ActiveSandbox {
    Container(ContainerSandbox),
    Subprocess(SubprocessSandbox),
}

impl ActiveSandbox {
    /// Pick a strategy per config: `container` and `subprocess` force one,
    /// `auto` probes for a usable container runtime and falls back.
    ///
    /// Fails only when the container strategy is forced but no runtime
    /// answers; `auto` degrades to the subprocess strategy instead.
    pub async fn detect(config: &FileSandboxConfig) -> Result<Self, SandboxError> {
        match config.strategy.as_str() {
            "container" => {
                if container::runtime_available().await {
                    Ok(Self::Container(ContainerSandbox::from_config(config)))
                } else {
                    Err(SandboxError::RuntimeUnavailable(
                        "container strategy requested but docker is not reachable".to_string(),
                    ))
                }
            }
            "subprocess" => Ok(Self::Subprocess(SubprocessSandbox::new())),
            _ => {
                if container::runtime_available().await {
                    info!("container runtime detected, using container sandbox");
                    Ok(Self::Container(ContainerSandbox::from_config(config)))
                } else {
                    warn!("no container runtime, falling back to subprocess sandbox");
                    Ok(Self::Subprocess(SubprocessSandbox::new()))
                }
            }
        }
    }
}

#[async_trait]
impl SandboxExecutor for ActiveSandbox {
    fn strategy(&self) -> SandboxStrategy {
        match self {
            ActiveSandbox::Container(_) => SandboxStrategy::Container,
            ActiveSandbox::Subprocess(_) => SandboxStrategy::Subprocess,
        }
    }

    async fn execute(&self, fragment: &CodeFragment, limits: &ExecutionLimits) -> ExecutionResult {
        match self {
            ActiveSandbox::Container(sandbox) => sandbox.execute(fragment, limits).await,
            ActiveSandbox::Subprocess(sandbox) => sandbox.execute(fragment, limits).await,
        }
    }
}
