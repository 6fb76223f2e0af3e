// SPDX-License-Identifier: MIT
//
// Conversion engine capability probe.
//
// The word-processing→PDF path depends on an external document engine
// (LibreOffice in headless mode, or whatever `VELLUM_SOFFICE` points at).
// Availability is probed exactly once at startup and the resolved engine
// is injected into the dispatcher: business logic never re-detects
// platform capabilities per request.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use vellum_core::error::{Result, VellumError};

use crate::bridge::CommandRunner;

/// Probe timeout for `--version`; generous because a cold LibreOffice
/// start can be slow.
const PROBE_TIMEOUT: Duration = Duration::from_secs(15);

/// A resolved external document-conversion engine.
#[derive(Clone)]
pub struct DocxEngine {
    program: String,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
}

impl std::fmt::Debug for DocxEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocxEngine")
            .field("program", &self.program)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl DocxEngine {
    /// Build an engine around a known program without probing. Used by
    /// `detect` once a candidate answers, and by tests with a fake runner.
    pub fn new(
        program: impl Into<String>,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            runner,
            timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Probe for a working engine: the configured override first, then the
    /// conventional binary names on PATH. Returns `None` when nothing
    /// answers: callers surface that as `ConversionUnavailable` at
    /// request time, not as a startup crash.
    pub async fn detect(
        override_path: Option<&str>,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
    ) -> Option<Self> {
        let mut candidates: Vec<&str> = Vec::new();
        if let Some(path) = override_path {
            candidates.push(path);
        }
        candidates.push("soffice");
        candidates.push("libreoffice");

        for candidate in candidates {
            let probe = runner
                .run(candidate, &["--version".to_string()], PROBE_TIMEOUT)
                .await;
            match probe {
                Ok(output) if output.success => {
                    info!(program = candidate, "conversion engine detected");
                    return Some(Self::new(candidate, runner.clone(), timeout));
                }
                Ok(output) => {
                    debug!(program = candidate, code = ?output.exit_code, "candidate probe failed");
                }
                Err(err) => {
                    debug!(program = candidate, %err, "candidate not runnable");
                }
            }
        }

        warn!("no conversion engine found; word-to-pdf will be unavailable");
        None
    }

    /// Convert `input` to PDF, writing into `outdir`.
    ///
    /// Only the subprocess outcome is judged here; the caller owns the
    /// output-existence check because the expected path is its contract.
    pub async fn convert_to_pdf(&self, input: &Path, outdir: &Path) -> Result<()> {
        let args = vec![
            "--headless".to_string(),
            "--convert-to".to_string(),
            "pdf".to_string(),
            "--outdir".to_string(),
            outdir.display().to_string(),
            input.display().to_string(),
        ];

        let output = self.runner.run(&self.program, &args, self.timeout).await?;
        if !output.success {
            return Err(VellumError::ConversionFailed(format!(
                "{} exited with {:?}: {}",
                self.program,
                output.exit_code,
                output.stderr.trim()
            )));
        }

        debug!(
            elapsed_ms = output.elapsed.as_millis() as u64,
            "engine conversion finished"
        );
        Ok(())
    }
}
