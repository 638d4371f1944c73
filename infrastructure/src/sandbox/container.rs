//! Container sandbox strategy
//!
//! Runs each fragment in a fresh container with networking disabled and
//! memory/CPU caps applied by the runtime. The container is named so it
//! can be force-removed on any exit path, including timeouts.

use super::{capture_output, file_suffix, interpreter};
use gateway_application::{ExecutionLimits, SandboxError};
use gateway_domain::{CodeFragment, ExecutionResult};
use std::io::Write;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::FileSandboxConfig;

static CONTAINER_SEQ: AtomicU64 = AtomicU64::new(0);

/// Probe for a usable container runtime.
pub async fn runtime_available() -> bool {
    if which::which("docker").is_err() {
        return false;
    }
    // The binary existing is not enough; the daemon must answer.
    Command::new("docker")
        .arg("info")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}

pub struct ContainerSandbox {
    python_image: String,
    javascript_image: String,
}

impl ContainerSandbox {
    pub fn new(python_image: impl Into<String>, javascript_image: impl Into<String>) -> Self {
        Self {
            python_image: python_image.into(),
            javascript_image: javascript_image.into(),
        }
    }

    pub fn from_config(config: &FileSandboxConfig) -> Self {
        Self::new(&config.python_image, &config.javascript_image)
    }

    fn image_for(&self, language: &str) -> &str {
        match language {
            "javascript" => &self.javascript_image,
            // Bash runs in the python image; both ship a POSIX shell
            _ => &self.python_image,
        }
    }

    pub async fn execute(
        &self,
        fragment: &CodeFragment,
        limits: &ExecutionLimits,
    ) -> ExecutionResult {
        let Some(program) = interpreter(&fragment.language) else {
            return ExecutionResult::failed(
                format!("unsupported language: {}", fragment.language),
                0.0,
            );
        };

        let scratch = match tempfile::Builder::new()
            .prefix("fragment")
            .suffix(file_suffix(&fragment.language))
            .tempfile()
        {
            Ok(mut file) => match file.write_all(fragment.code.as_bytes()) {
                Ok(()) => file,
                Err(e) => return ExecutionResult::failed(format!("scratch file: {e}"), 0.0),
            },
            Err(e) => return ExecutionResult::failed(format!("scratch file: {e}"), 0.0),
        };

        let name = format!(
            "gateway-sbx-{}-{}",
            std::process::id(),
            CONTAINER_SEQ.fetch_add(1, Ordering::Relaxed)
        );
        let args = docker_run_args(
            &name,
            self.image_for(&fragment.language),
            program,
            &scratch.path().to_string_lossy(),
            limits,
        );

        debug!(language = %fragment.language, container = %name, "running fragment in container");
        let started = Instant::now();

        let mut command = Command::new("docker");
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let outcome = tokio::time::timeout(limits.timeout, command.output()).await;
        let execution_time = started.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(Ok(output)) => {
                let (stdout, out_truncated) =
                    capture_output(&output.stdout, limits.max_output_bytes);
                let (stderr, err_truncated) =
                    capture_output(&output.stderr, limits.max_output_bytes);
                let exit_code = output.status.code().unwrap_or(-1);
                // 137 is usually the runtime's OOM SIGKILL, but a program
                // may also exit(137) on its own; only the runtime knows.
                if exit_code == 137 && oom_killed(&name).await {
                    ExecutionResult::failed(
                        SandboxError::ResourceExceeded(format!(
                            "memory cap of {} bytes hit (exit 137)",
                            limits.memory_bytes
                        ))
                        .to_string(),
                        execution_time,
                    )
                } else {
                    ExecutionResult::completed(exit_code, stdout, stderr, execution_time)
                        .with_truncated(out_truncated || err_truncated)
                }
            }
            Ok(Err(e)) => ExecutionResult::failed(format!("container spawn failed: {e}"), execution_time),
            Err(_) => ExecutionResult::failed(
                SandboxError::Timeout(limits.timeout).to_string(),
                execution_time,
            ),
        };

        // Unconditional teardown; a timed-out container is still running.
        remove_container(&name).await;
        result
    }
}

/// Arguments for one `docker run` invocation. The scratch file is bind
/// mounted read-only and networking is disabled.
fn docker_run_args(
    name: &str,
    image: &str,
    program: &str,
    scratch_path: &str,
    limits: &ExecutionLimits,
) -> Vec<String> {
    vec![
        "run".to_string(),
        "--name".to_string(),
        name.to_string(),
        "--network".to_string(),
        "none".to_string(),
        "--memory".to_string(),
        format!("{}b", limits.memory_bytes),
        "--cpus".to_string(),
        format!("{}", limits.cpu_limit),
        "-v".to_string(),
        format!("{scratch_path}:/workspace/code:ro"),
        image.to_string(),
        program.to_string(),
        "/workspace/code".to_string(),
    ]
}

/// Ask the runtime whether it OOM-killed the container. Must run before
/// teardown removes the container state.
async fn oom_killed(name: &str) -> bool {
    Command::new("docker")
        .args(["inspect", "--format", "{{.State.OOMKilled}}", name])
        .stderr(Stdio::null())
        .output()
        .await
        .map(|output| parse_oom_flag(&output.stdout))
        .unwrap_or(false)
}

fn parse_oom_flag(stdout: &[u8]) -> bool {
    String::from_utf8_lossy(stdout).trim() == "true"
}

async fn remove_container(name: &str) {
    let removed = Command::new("docker")
        .args(["rm", "-f", name])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;
    if let Err(e) = removed {
        warn!(container = %name, error = %e, "container teardown failed");
    }
}
