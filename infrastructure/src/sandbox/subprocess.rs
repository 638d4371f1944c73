//! Subprocess sandbox strategy
//!
//! Fallback when no container runtime is present: the fragment runs as a
//! child process in its own session with OS resource limits applied
//! between fork and exec. Weaker isolation than a container (no
//! filesystem or network barrier), which is why this strategy is only
//! the fallback.

use super::{capture_output, file_suffix, interpreter};
use gateway_application::{ExecutionLimits, SandboxError};
use gateway_domain::{CodeFragment, ExecutionResult};
use std::io::Write;
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::debug;

#[derive(Default)]
pub struct SubprocessSandbox;

impl SubprocessSandbox {
    pub fn new() -> Self {
        Self
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

        debug!(language = %fragment.language, program, "running fragment as subprocess");
        let started = Instant::now();

        let mut command = Command::new(program);
        command
            .arg(scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        apply_rlimits(&mut command, limits);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ExecutionResult::failed(
                    format!("failed to spawn {program}: {e}"),
                    started.elapsed().as_secs_f64(),
                );
            }
        };
        let pid = child.id();

        match tokio::time::timeout(limits.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let execution_time = started.elapsed().as_secs_f64();
                let (stdout, out_truncated) =
                    capture_output(&output.stdout, limits.max_output_bytes);
                let (stderr, err_truncated) =
                    capture_output(&output.stderr, limits.max_output_bytes);
                // No exit code means a signal, which under these rlimits is
                // the kernel enforcing the CPU or memory cap.
                match output.status.code() {
                    Some(exit_code) => {
                        ExecutionResult::completed(exit_code, stdout, stderr, execution_time)
                            .with_truncated(out_truncated || err_truncated)
                    }
                    None => ExecutionResult::failed(
                        SandboxError::ResourceExceeded(
                            "process terminated by signal".to_string(),
                        )
                        .to_string(),
                        execution_time,
                    ),
                }
            }
            Ok(Err(e)) => ExecutionResult::failed(
                format!("wait failed: {e}"),
                started.elapsed().as_secs_f64(),
            ),
            Err(_) => {
                kill_process_group(pid);
                ExecutionResult::failed(
                    SandboxError::Timeout(limits.timeout).to_string(),
                    started.elapsed().as_secs_f64(),
                )
            }
        }
    }
}

/// Put the child in its own session and cap address space, CPU seconds,
/// and process count between fork and exec.
#[cfg(target_os = "linux")]
fn apply_rlimits(command: &mut Command, limits: &ExecutionLimits) {
    let memory_bytes = limits.memory_bytes;
    let cpu_seconds = (limits.cpu_limit * limits.timeout.as_secs_f64())
        .ceil()
        .max(1.0) as libc::rlim_t;

    unsafe {
        command.pre_exec(move || {
            libc::setsid();

            let address_space = libc::rlimit {
                rlim_cur: memory_bytes,
                rlim_max: memory_bytes,
            };
            libc::setrlimit(libc::RLIMIT_AS, &address_space);

            let cpu = libc::rlimit {
                rlim_cur: cpu_seconds,
                rlim_max: cpu_seconds,
            };
            libc::setrlimit(libc::RLIMIT_CPU, &cpu);

            // Guard against fork bombs
            let nproc = libc::rlimit {
                rlim_cur: 64,
                rlim_max: 64,
            };
            libc::setrlimit(libc::RLIMIT_NPROC, &nproc);

            Ok(())
        });
    }
}

#[cfg(not(target_os = "linux"))]
fn apply_rlimits(_command: &mut Command, _limits: &ExecutionLimits) {}

/// Kill the child's whole session; the direct child alone is also killed
/// on drop, but grandchildren would otherwise survive a timeout.
#[cfg(target_os = "linux")]
fn kill_process_group(pid: Option<u32>) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        }
    }
}

#[cfg(not(target_os = "linux"))]
fn kill_process_group(_pid: Option<u32>) {}
