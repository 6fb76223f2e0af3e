// SPDX-License-Identifier: MIT
//
// External process bridge: the only place in the codebase that spawns
// subprocesses. Conversion strategies depend on the `CommandRunner` trait,
// not on process-spawning details, so tests substitute a fake bridge.
//
// One attempt per call, bounded by a hard timeout. On timeout the child is
// abandoned (killed via kill_on_drop); the bridge never resumes or
// re-checks an external process.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use vellum_core::error::{Result, VellumError};

/// Structured result of one subprocess run.
#[derive(Debug)]
pub struct BridgeOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Raw exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
    /// Wall-clock time the process ran.
    pub elapsed: Duration,
}

/// Narrow subprocess interface: (program, args, timeout) in, structured
/// result out.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<BridgeOutput>;
}

/// The real bridge, backed by `tokio::process`.
#[derive(Debug, Default)]
pub struct ProcessBridge;

#[async_trait]
impl CommandRunner for ProcessBridge {
    async fn run(&self, program: &str, args: &[String], timeout: Duration) -> Result<BridgeOutput> {
        let started = Instant::now();

        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program, ?args, timeout_secs = timeout.as_secs(), "spawning subprocess");

        let output = match tokio::time::timeout(timeout, command.output()).await {
            Ok(result) => result.map_err(|err| {
                VellumError::ConversionUnavailable(format!("cannot run {program}: {err}"))
            })?,
            Err(_) => {
                warn!(program, timeout_secs = timeout.as_secs(), "subprocess timed out");
                return Err(VellumError::ConversionTimeout {
                    seconds: timeout.as_secs(),
                });
            }
        };

        let elapsed = started.elapsed();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        debug!(
            program,
            code = ?output.status.code(),
            elapsed_ms = elapsed.as_millis() as u64,
            "subprocess finished"
        );

        Ok(BridgeOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            stderr,
            elapsed,
        })
    }
}
